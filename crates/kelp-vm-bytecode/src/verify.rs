//! Structural verification of module payloads
//!
//! Disassembly and literal parsing trust the tables they are handed. A
//! payload coming out of a container must pass a [`Verifier`] first.

use tracing::warn;

use crate::error::{BytecodeError, Result};
use crate::instruction::{Cursor, Instruction};
use crate::module::Module;
use crate::operand::{SpecIdentIndex, TypeIndex};
use crate::symbols::NativeRegistry;
use crate::types::{TypeDescriptor, TypeKind};

/// Checks a raw module payload before it is used
pub trait Verifier {
    /// Verify a raw (decompressed) payload
    fn verify(&self, raw: &[u8]) -> Result<()>;

    /// Boolean form of [`verify`](Self::verify)
    fn is_valid(&self, raw: &[u8]) -> bool {
        self.verify(raw).is_ok()
    }
}

/// Verifier that checks table bounds and walks the instruction stream
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleVerifier<'a> {
    natives: Option<&'a NativeRegistry>,
}

impl<'a> ModuleVerifier<'a> {
    /// Verifier that does not check native function indices
    pub fn new() -> Self {
        Self { natives: None }
    }

    /// Verifier that also checks `BCALL` operands against `natives`
    pub fn with_natives(natives: &'a NativeRegistry) -> Self {
        Self {
            natives: Some(natives),
        }
    }

    /// Verify an already deserialized module
    pub fn verify_module(&self, module: &Module) -> Result<()> {
        self.check_types(module)?;
        self.check_symbols(module)?;
        self.check_lines(module)?;
        self.check_code(module)
    }

    fn check_types(&self, module: &Module) -> Result<()> {
        let types = &module.types;
        let in_range = |t: TypeIndex| t.as_usize() < types.len();
        for (idx, descriptor) in types.iter() {
            let bad = |reason: String| BytecodeError::InvalidType {
                index: idx.index(),
                reason,
            };
            match descriptor {
                TypeDescriptor::Scalar(kind @ (TypeKind::Vector | TypeKind::Struct)) => {
                    return Err(bad(format!("{kind} cannot be a scalar")));
                }
                TypeDescriptor::Scalar(_) => {}
                TypeDescriptor::Vector { element } => {
                    if !in_range(*element) {
                        return Err(bad(format!("element type {element} out of range")));
                    }
                }
                TypeDescriptor::Struct { struct_id, fields } => {
                    let info = module
                        .structs
                        .get(struct_id.as_usize())
                        .ok_or_else(|| bad(format!("struct {struct_id} out of range")))?;
                    if info.fields.len() != fields.len() {
                        return Err(bad(format!(
                            "struct {} has {} fields, descriptor has {}",
                            info.name,
                            info.fields.len(),
                            fields.len()
                        )));
                    }
                    if let Some(field) = fields.iter().find(|f| !in_range(**f)) {
                        return Err(bad(format!("field type {field} out of range")));
                    }
                }
            }
        }
        Ok(())
    }

    fn check_symbols(&self, module: &Module) -> Result<()> {
        for (i, spec) in module.spec_idents.iter().enumerate() {
            if spec.ident.as_usize() >= module.idents.len() || spec.ty.as_usize() >= module.types.len() {
                return Err(BytecodeError::InvalidType {
                    index: spec.ty.index(),
                    reason: format!("specialized identifier {i} references a missing entry"),
                });
            }
        }
        Ok(())
    }

    fn check_lines(&self, module: &Module) -> Result<()> {
        if module.filenames.is_empty() {
            return Ok(());
        }
        match module
            .line_table
            .entries()
            .iter()
            .find(|l| l.file.as_usize() >= module.filenames.len())
        {
            Some(l) => Err(BytecodeError::InvalidLineTable(format!(
                "entry at {} names file {}",
                l.bytecode_start, l.file
            ))),
            None => Ok(()),
        }
    }

    fn check_code(&self, module: &Module) -> Result<()> {
        let mut cur = Cursor::new(&module.instructions);
        while !cur.is_at_end() {
            let offset = cur.position();
            let insn = Instruction::decode(&mut cur)?;
            let fail = |what: String| -> Result<()> { Err(BytecodeError::operand(offset, what)) };
            let ident_ok = |v: SpecIdentIndex| v.as_usize() < module.spec_idents.len();

            match &insn {
                Instruction::Return { function, .. } if *function >= 0 => {
                    if *function as usize >= module.functions.len() {
                        return fail(format!("function {function} out of range"));
                    }
                }
                Instruction::Call { function, .. } => {
                    if module.function(*function).is_none() {
                        return fail(format!("function {function} out of range"));
                    }
                }
                Instruction::NewVec { ty, count } => match module.types.get(*ty) {
                    None => return fail(format!("type {ty} out of range")),
                    Some(TypeDescriptor::Vector { .. } | TypeDescriptor::Struct { .. }) if *count >= 0 => {}
                    Some(d) => return fail(format!("cannot construct {} with {count} elements", d.kind())),
                },
                Instruction::BCall { native } => {
                    if let Some(natives) = self.natives
                        && natives.name(*native).is_none()
                    {
                        return fail(format!("native {native} not registered"));
                    }
                }
                Instruction::Var { var, .. } => {
                    if !ident_ok(*var) {
                        return fail(format!("identifier {var} out of range"));
                    }
                }
                Instruction::FunStart { params, returns, .. } => {
                    if let Some(var) = params.iter().chain(returns).find(|v| !ident_ok(**v)) {
                        return fail(format!("identifier {var} out of range"));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl Verifier for ModuleVerifier<'_> {
    fn verify(&self, raw: &[u8]) -> Result<()> {
        let module = Module::from_bytes(raw)?;
        self.verify_module(&module).inspect_err(|e| {
            warn!(error = %e, "module failed verification");
        })
    }
}
