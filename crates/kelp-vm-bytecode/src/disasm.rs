//! Human-readable disassembly
//!
//! Each instruction renders as one line:
//!
//! ```text
//! I <offset> \tL <line> \t<MNEMONIC> <operands>
//! ```
//!
//! Offsets are word offsets into the instruction stream. The stream must have
//! been verified first; a malformed stream produces an error, not a partial
//! listing.

use std::fmt::Write;

use tracing::debug;

use crate::error::{BytecodeError, Result};
use crate::instruction::{Cursor, Instruction};
use crate::module::Module;
use crate::opcode::LvalOp;
use crate::operand::{FunctionIndex, SpecIdentIndex};
use crate::symbols::NativeRegistry;
use crate::types::TypeDescriptor;

/// Renders a module's instruction stream
#[derive(Debug, Clone, Copy)]
pub struct Disassembler<'a> {
    module: &'a Module,
    natives: &'a NativeRegistry,
}

impl<'a> Disassembler<'a> {
    /// Create a disassembler resolving `BCALL` names through `natives`
    pub fn new(module: &'a Module, natives: &'a NativeRegistry) -> Self {
        Self { module, natives }
    }

    /// Disassemble the instruction at `offset`.
    ///
    /// Returns the rendered line (without a newline) and the offset of the
    /// next instruction.
    pub fn disassemble_one(&self, offset: usize) -> Result<(String, usize)> {
        let mut line = String::new();
        let next = self.write_instruction(&mut line, offset)?;
        Ok((line, next))
    }

    /// Disassemble the whole stream, one newline-terminated line per instruction
    pub fn disassemble(&self) -> Result<String> {
        let code = &self.module.instructions;
        let mut out = String::new();
        let mut offset = 0;
        let mut count = 0usize;
        while offset < code.len() {
            offset = self.write_instruction(&mut out, offset)?;
            out.push('\n');
            count += 1;
        }
        debug!(instructions = count, words = code.len(), "disassembled module");
        Ok(out)
    }

    fn write_instruction(&self, out: &mut String, offset: usize) -> Result<usize> {
        let mut cur = Cursor::at(&self.module.instructions, offset);
        let insn = Instruction::decode(&mut cur)?;
        let line = self.module.line_table.lookup_line(offset);

        write!(out, "I {offset} \tL {line} \t{} ", insn.opcode().name())?;

        match &insn {
            Instruction::Plain(_) => {}

            Instruction::Imm { value, .. } => {
                write!(out, "{value}")?;
            }

            Instruction::Return { function, .. } => match FunctionIndex::from_word(*function) {
                Some(f) => out.push_str(self.function_name(f, offset)?),
                None => {
                    write!(out, "{function}")?;
                }
            },

            Instruction::CallV { argc, method, .. } => {
                write!(out, "{argc} m:{method}")?;
            }

            Instruction::Call {
                argc,
                function,
                target,
                type_mask,
                ..
            } => {
                let name = self.function_name(*function, offset)?;
                write!(out, "{argc} {name} {target} m:{type_mask}")?;
            }

            Instruction::NewVec { ty, count } => {
                let label = match self.module.types.get(*ty) {
                    Some(TypeDescriptor::Struct { struct_id, .. }) => self
                        .module
                        .structs
                        .get(struct_id.as_usize())
                        .map(|s| s.name.as_str())
                        .ok_or_else(|| BytecodeError::operand(offset, format!("struct {struct_id} out of range")))?,
                    Some(_) => "vector",
                    None => return Err(BytecodeError::operand(offset, format!("type {ty} out of range"))),
                };
                write!(out, "{label} {count}")?;
            }

            Instruction::BCall { native } => {
                let name = self
                    .natives
                    .name(*native)
                    .ok_or_else(|| BytecodeError::operand(offset, format!("native {native} not registered")))?;
                out.push_str(name);
            }

            Instruction::Var { lval, var, .. } => {
                write_lval(out, *lval);
                out.push_str(self.ident_name(*var, offset)?);
            }

            Instruction::Slot { lval, slot, .. } => {
                write_lval(out, *lval);
                write!(out, "{slot}")?;
            }

            Instruction::LvalIdx { lval, .. } => write_lval(out, Some(*lval)),

            Instruction::PushFlt(f) => {
                write!(out, "{f:.6}")?;
            }

            Instruction::PushStr(s) => {
                write!(out, "{s:?}")?;
            }

            Instruction::FunStart {
                params,
                returns,
                log_len,
            } => {
                for &p in params {
                    out.push_str(self.ident_name(p, offset)?);
                    out.push(' ');
                }
                out.push_str("=> ");
                for &r in returns {
                    out.push_str(self.ident_name(r, offset)?);
                    out.push(' ');
                }
                if *log_len != 0 {
                    write!(out, "(log = {log_len})")?;
                }
            }

            Instruction::Coro { target, locals } => {
                write!(out, "{target}")?;
                for v in locals {
                    write!(out, " v{v}")?;
                }
            }

            Instruction::FunMulti { overloads, argc } => {
                write!(out, "{overloads} {argc}")?;
            }
        }

        Ok(cur.position())
    }

    fn function_name(&self, f: FunctionIndex, offset: usize) -> Result<&'a str> {
        self.module
            .functions
            .get(f.as_usize())
            .map(|f| f.name.as_str())
            .ok_or_else(|| BytecodeError::operand(offset, format!("function {f} out of range")))
    }

    fn ident_name(&self, var: SpecIdentIndex, offset: usize) -> Result<&'a str> {
        self.module
            .ident_name(var)
            .ok_or_else(|| BytecodeError::operand(offset, format!("identifier {var} out of range")))
    }
}

fn write_lval(out: &mut String, lval: Option<LvalOp>) {
    if let Some(lval) = lval {
        out.push_str(lval.name());
        out.push(' ');
    }
}

/// Disassemble a whole module
pub fn disassemble(module: &Module, natives: &NativeRegistry) -> Result<String> {
    Disassembler::new(module, natives).disassemble()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_table::LineInfo;
    use crate::opcode::Opcode;
    use crate::symbols::{FunctionInfo, StructInfo};
    use crate::types::TypeTable;

    fn w(op: Opcode) -> i32 {
        op.to_word()
    }

    #[test]
    fn test_header_and_line_lookup() {
        let mut b = Module::builder();
        b.emit_line(1, [w(Opcode::PushInt), 5]);
        b.emit_line(2, [w(Opcode::Pop)]);
        let module = b.build().unwrap();
        let natives = NativeRegistry::new();

        let text = disassemble(&module, &natives).unwrap();
        assert_eq!(text, "I 0 \tL 1 \tPUSHINT 5\nI 2 \tL 2 \tPOP \n");
    }

    #[test]
    fn test_call_and_return_names() {
        let mut b = Module::builder();
        let f = b.add_function(FunctionInfo::new("fib", 0));
        b.emit_line(3, [w(Opcode::Call), 1, f.index() as i32, 0, 7]);
        b.emit([w(Opcode::Return), f.index() as i32, 1, 1]);
        b.emit([w(Opcode::Return), -1, 0, 0]);
        let module = b.build().unwrap();
        let natives = NativeRegistry::new();
        let d = Disassembler::new(&module, &natives);

        let (line, next) = d.disassemble_one(0).unwrap();
        assert_eq!(line, "I 0 \tL 3 \tCALL 1 fib 0 m:7");
        assert_eq!(next, 5);
        let (line, next) = d.disassemble_one(next).unwrap();
        assert_eq!(line, "I 5 \tL 3 \tRETURN fib");
        let (line, _) = d.disassemble_one(next).unwrap();
        assert_eq!(line, "I 9 \tL 3 \tRETURN -1");
    }

    #[test]
    fn test_newvec_labels() {
        let mut types = TypeTable::with_builtins();
        let point = types.push(TypeDescriptor::Struct {
            struct_id: crate::operand::StructIndex(0),
            fields: vec![crate::TypeIndex::INT, crate::TypeIndex::INT],
        });
        let mut b = Module::builder().types(types);
        b.add_struct(StructInfo::new("Point", ["x", "y"]));
        b.emit_line(1, [w(Opcode::NewVec), point.index() as i32, 2]);
        b.emit([w(Opcode::NewVec), crate::TypeIndex::VECTOR_ANY.index() as i32, 3]);
        let module = b.build().unwrap();
        let natives = NativeRegistry::new();

        let text = disassemble(&module, &natives).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "I 0 \tL 1 \tNEWVEC Point 2");
        assert_eq!(lines[1], "I 3 \tL 1 \tNEWVEC vector 3");
    }

    #[test]
    fn test_float_operands_use_six_decimals() {
        let mut b = Module::builder();
        b.emit_line(1, [w(Opcode::PushFlt), 1.0f32.to_bits() as i32]);
        b.emit([w(Opcode::PushFlt), (-0.25f32).to_bits() as i32]);
        let module = b.build().unwrap();
        let natives = NativeRegistry::new();

        let text = disassemble(&module, &natives).unwrap();
        assert_eq!(text, "I 0 \tL 1 \tPUSHFLT 1.000000\nI 2 \tL 1 \tPUSHFLT -0.250000\n");
    }

    #[test]
    fn test_unregistered_native_is_an_error() {
        let mut b = Module::builder();
        b.emit_line(1, [w(Opcode::BCall), 4]);
        let module = b.build().unwrap();
        let natives = NativeRegistry::new();
        assert!(matches!(
            disassemble(&module, &natives),
            Err(BytecodeError::InvalidOperand { offset: 0, .. })
        ));
    }

    #[test]
    fn test_lines_follow_line_table() {
        let mut b = Module::builder();
        b.emit_line(10, [w(Opcode::Dup)]);
        b.emit([w(Opcode::Dup)]);
        b.emit_line(11, [w(Opcode::Dup)]);
        let module = b.build().unwrap();
        assert_eq!(module.line_table.entries(), &[LineInfo::new(0, 10), LineInfo::new(2, 11)]);

        let natives = NativeRegistry::new();
        let text = disassemble(&module, &natives).unwrap();
        assert!(text.contains("I 1 \tL 10 \tDUP"));
        assert!(text.contains("I 2 \tL 11 \tDUP"));
    }
}
