//! Instruction decoding
//!
//! The instruction stream is a flat `[i32]`: an opcode word followed by a
//! number of operand words that only the opcode determines. Nothing in the
//! stream records an instruction's length, so [`Instruction::decode`] is the
//! one place that knows how many words each opcode consumes.
//!
//! Decoding is meant for streams that already passed verification; reads past
//! the end surface as [`BytecodeError::UnexpectedEnd`] instead of being
//! tolerated.

use crate::error::{BytecodeError, Result};
use crate::opcode::{LvalOp, Opcode};
use crate::operand::{FunctionIndex, NativeIndex, SpecIdentIndex, TypeIndex};

/// Read position in an instruction stream
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    code: &'a [i32],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Cursor at the start of `code`
    pub fn new(code: &'a [i32]) -> Self {
        Self { code, pos: 0 }
    }

    /// Cursor at word offset `pos`
    pub fn at(code: &'a [i32], pos: usize) -> Self {
        Self { code, pos }
    }

    /// Current word offset
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Whether every word has been consumed
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.code.len()
    }

    /// Consume one word
    #[inline]
    pub fn read(&mut self) -> Result<i32> {
        let word = *self
            .code
            .get(self.pos)
            .ok_or(BytecodeError::UnexpectedEnd(self.pos))?;
        self.pos += 1;
        Ok(word)
    }

    /// Consume a word that must be a non-negative count
    pub fn read_count(&mut self) -> Result<usize> {
        let at = self.pos;
        let word = self.read()?;
        usize::try_from(word).map_err(|_| BytecodeError::operand(at, format!("negative count {word}")))
    }

    /// Consume `n` words without looking at them
    pub fn skip(&mut self, n: usize) -> Result<()> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.code.len())
            .ok_or(BytecodeError::UnexpectedEnd(self.code.len()))?;
        self.pos = end;
        Ok(())
    }

    fn read_index<T>(&mut self, what: &str, convert: fn(i32) -> Option<T>) -> Result<T> {
        let at = self.pos;
        let word = self.read()?;
        convert(word).ok_or_else(|| BytecodeError::operand(at, format!("negative {what} index {word}")))
    }

    fn read_indices<T>(&mut self, what: &str, convert: fn(i32) -> Option<T>) -> Result<Vec<T>> {
        let n = self.read_count()?;
        (0..n).map(|_| self.read_index(what, convert)).collect()
    }
}

/// One decoded instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Opcode with no operands
    Plain(Opcode),
    /// Opcode with a single integer operand (literals, loops, jumps, type
    /// tests, log reads, exit)
    Imm {
        /// The opcode
        op: Opcode,
        /// The operand
        value: i32,
    },
    /// `RETURN function nretvals rettype`
    Return {
        /// Function index, or a negative sentinel
        function: i32,
        /// Number of returned values
        ret_count: i32,
        /// Type of the returned values
        ret_type: i32,
    },
    /// `CALLV`/`CALLVCOND argc method`
    CallV {
        /// The opcode
        op: Opcode,
        /// Argument count
        argc: i32,
        /// Vtable / method slot
        method: i32,
    },
    /// `CALL`/`CALLMULTI argc function target typemask [argtypes...]`
    Call {
        /// The opcode
        op: Opcode,
        /// Argument count
        argc: usize,
        /// Called function
        function: FunctionIndex,
        /// Bytecode offset of the target
        target: i32,
        /// Specialization / type mask id
        type_mask: i32,
    },
    /// `NEWVEC type count`
    NewVec {
        /// Type of the constructed vector or struct
        ty: TypeIndex,
        /// Number of elements taken from the stack
        count: i32,
    },
    /// `BCALL native`
    BCall {
        /// Native function called
        native: NativeIndex,
    },
    /// `PUSHVAR`/`PUSHVARREF`/`LVALVAR [lvalop] var`
    Var {
        /// The opcode
        op: Opcode,
        /// Qualifier, present for `LVALVAR`
        lval: Option<LvalOp>,
        /// Accessed variable
        var: SpecIdentIndex,
    },
    /// `PUSHFLD`/`PUSHFLDM`/`PUSHLOC`/`LVALFLD`/`LVALLOC [lvalop] slot`
    Slot {
        /// The opcode
        op: Opcode,
        /// Qualifier, present for `LVALFLD`/`LVALLOC`
        lval: Option<LvalOp>,
        /// Field or local slot number
        slot: i32,
    },
    /// `LVALIDXI`/`LVALIDXV lvalop`
    LvalIdx {
        /// The opcode
        op: Opcode,
        /// Qualifier
        lval: LvalOp,
    },
    /// `PUSHFLT bits`
    PushFlt(f32),
    /// `PUSHSTR chars... 0`
    PushStr(String),
    /// `FUNSTART nparams params... nreturns returns... loglen`
    FunStart {
        /// Parameter identifiers
        params: Vec<SpecIdentIndex>,
        /// Identifiers bound to return slots
        returns: Vec<SpecIdentIndex>,
        /// Replay log length, 0 when the function is not logged
        log_len: i32,
    },
    /// `CORO target typeinfo n locals...`
    Coro {
        /// Coroutine body offset
        target: i32,
        /// Captured local variable numbers
        locals: Vec<i32>,
    },
    /// `FUNMULTI n nargs table...`; the `n * (2 * nargs + 1)` table words
    /// are skipped
    FunMulti {
        /// Number of overloads
        overloads: usize,
        /// Arguments per overload
        argc: usize,
    },
}

fn lval_qualifier(cur: &mut Cursor<'_>) -> Result<LvalOp> {
    let at = cur.position();
    let word = cur.read()?;
    LvalOp::from_word(word).ok_or_else(|| BytecodeError::operand(at, format!("unknown lvalue op {word}")))
}

impl Instruction {
    /// Decode the instruction under `cur`, leaving it on the next instruction
    pub fn decode(cur: &mut Cursor<'_>) -> Result<Self> {
        let offset = cur.position();
        let word = cur.read()?;
        let op = Opcode::from_word(word).ok_or(BytecodeError::InvalidOpcode { opcode: word, offset })?;

        let insn = match op {
            Opcode::IFor
            | Opcode::VFor
            | Opcode::SFor
            | Opcode::IForRef
            | Opcode::VForRef
            | Opcode::SForRef
            | Opcode::PushInt
            | Opcode::PushFun
            | Opcode::Cont1
            | Opcode::Jump
            | Opcode::JumpFail
            | Opcode::JumpFailR
            | Opcode::JumpFailN
            | Opcode::JumpNoFail
            | Opcode::JumpNoFailR
            | Opcode::JumpFailRef
            | Opcode::JumpFailRRef
            | Opcode::JumpFailNRef
            | Opcode::JumpNoFailRef
            | Opcode::JumpNoFailRRef
            | Opcode::LogRead
            | Opcode::LogReadRef
            | Opcode::IsType
            | Opcode::Exit => Self::Imm {
                op,
                value: cur.read()?,
            },

            Opcode::Return => Self::Return {
                function: cur.read()?,
                ret_count: cur.read()?,
                ret_type: cur.read()?,
            },

            Opcode::CallV | Opcode::CallVCond => Self::CallV {
                op,
                argc: cur.read()?,
                method: cur.read()?,
            },

            Opcode::Call | Opcode::CallMulti => {
                let argc = cur.read_count()?;
                let function = cur.read_index("function", FunctionIndex::from_word)?;
                let target = cur.read()?;
                let type_mask = cur.read()?;
                if op == Opcode::CallMulti {
                    // static argument types
                    cur.skip(argc)?;
                }
                Self::Call {
                    op,
                    argc,
                    function,
                    target,
                    type_mask,
                }
            }

            Opcode::NewVec => Self::NewVec {
                ty: cur.read_index("type", TypeIndex::from_word)?,
                count: cur.read()?,
            },

            Opcode::BCall => Self::BCall {
                native: cur.read_index("native", NativeIndex::from_word)?,
            },

            Opcode::LvalVar | Opcode::PushVar | Opcode::PushVarRef => {
                let lval = if op == Opcode::LvalVar {
                    Some(lval_qualifier(cur)?)
                } else {
                    None
                };
                Self::Var {
                    op,
                    lval,
                    var: cur.read_index("identifier", SpecIdentIndex::from_word)?,
                }
            }

            Opcode::LvalFld | Opcode::LvalLoc | Opcode::PushFld | Opcode::PushFldM | Opcode::PushLoc => {
                let lval = if matches!(op, Opcode::LvalFld | Opcode::LvalLoc) {
                    Some(lval_qualifier(cur)?)
                } else {
                    None
                };
                Self::Slot {
                    op,
                    lval,
                    slot: cur.read()?,
                }
            }

            Opcode::LvalIdxI | Opcode::LvalIdxV => Self::LvalIdx {
                op,
                lval: lval_qualifier(cur)?,
            },

            Opcode::PushFlt => Self::PushFlt(f32::from_bits(cur.read()? as u32)),

            Opcode::PushStr => {
                let mut s = String::new();
                loop {
                    let c = cur.read()?;
                    if c == 0 {
                        break;
                    }
                    s.push(char::from_u32(c as u32).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
                Self::PushStr(s)
            }

            Opcode::FunStart => Self::FunStart {
                params: cur.read_indices("identifier", SpecIdentIndex::from_word)?,
                returns: cur.read_indices("identifier", SpecIdentIndex::from_word)?,
                log_len: cur.read()?,
            },

            Opcode::Coro => {
                let target = cur.read()?;
                cur.skip(1)?; // type info
                let n = cur.read_count()?;
                let locals = (0..n).map(|_| cur.read()).collect::<Result<_>>()?;
                Self::Coro { target, locals }
            }

            Opcode::FunMulti => {
                let overloads = cur.read_count()?;
                let argc = cur.read_count()?;
                let table = argc
                    .checked_mul(2)
                    .and_then(|n| n.checked_add(1))
                    .and_then(|n| n.checked_mul(overloads))
                    .ok_or_else(|| BytecodeError::operand(offset, "dispatch table size overflows"))?;
                cur.skip(table)?;
                Self::FunMulti { overloads, argc }
            }

            Opcode::PushNil
            | Opcode::PushIdxI
            | Opcode::PushIdxV
            | Opcode::FunEnd
            | Opcode::Pop
            | Opcode::PopRef
            | Opcode::Dup
            | Opcode::IAdd
            | Opcode::ISub
            | Opcode::IMul
            | Opcode::IDiv
            | Opcode::IMod
            | Opcode::ILt
            | Opcode::IGt
            | Opcode::ILe
            | Opcode::IGe
            | Opcode::IEq
            | Opcode::INe
            | Opcode::FAdd
            | Opcode::FSub
            | Opcode::FMul
            | Opcode::FDiv
            | Opcode::FLt
            | Opcode::FGt
            | Opcode::FLe
            | Opcode::FGe
            | Opcode::FEq
            | Opcode::FNe
            | Opcode::SAdd
            | Opcode::SEq
            | Opcode::SNe
            | Opcode::UMinus
            | Opcode::LogNot
            | Opcode::LogNotRef
            | Opcode::I2F
            | Opcode::A2S
            | Opcode::E2B
            | Opcode::E2BRef
            | Opcode::CoCl
            | Opcode::CoEnd
            | Opcode::Abort => Self::Plain(op),
        };
        Ok(insn)
    }

    /// The instruction's opcode
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Plain(op)
            | Self::Imm { op, .. }
            | Self::CallV { op, .. }
            | Self::Call { op, .. }
            | Self::Var { op, .. }
            | Self::Slot { op, .. }
            | Self::LvalIdx { op, .. } => *op,
            Self::Return { .. } => Opcode::Return,
            Self::NewVec { .. } => Opcode::NewVec,
            Self::BCall { .. } => Opcode::BCall,
            Self::PushFlt(_) => Opcode::PushFlt,
            Self::PushStr(_) => Opcode::PushStr,
            Self::FunStart { .. } => Opcode::FunStart,
            Self::Coro { .. } => Opcode::Coro,
            Self::FunMulti { .. } => Opcode::FunMulti,
        }
    }
}
