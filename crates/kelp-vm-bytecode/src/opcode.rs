//! Opcode and l-value operation tables
//!
//! Both tables map a raw instruction word to a variant and to the upper-case
//! mnemonic printed by the disassembler.

use serde::{Deserialize, Serialize};

macro_rules! word_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:literal => $mnemonic:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[repr(i32)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value,)*
        }

        impl $name {
            /// Every variant, in word order
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            /// Convert from a raw instruction word
            pub fn from_word(word: i32) -> Option<Self> {
                match word {
                    $($value => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Convert to a raw instruction word
            #[inline]
            pub const fn to_word(self) -> i32 {
                self as i32
            }

            /// Mnemonic used in disassembly
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $mnemonic,)*
                }
            }
        }
    };
}

word_enum! {
    /// Instruction opcodes
    pub enum Opcode {
        // ==================== Literals ====================
        /// Push integer immediate
        PushInt = 0 => "PUSHINT",
        /// Push float immediate (one word, f32 bits)
        PushFlt = 1 => "PUSHFLT",
        /// Push string literal (one word per char, zero terminated)
        PushStr = 2 => "PUSHSTR",
        /// Push nil
        PushNil = 3 => "PUSHNIL",
        /// Push function value by bytecode offset
        PushFun = 4 => "PUSHFUN",

        // ==================== Variables ====================
        /// Read variable
        PushVar = 5 => "PUSHVAR",
        /// Read ref-counted variable
        PushVarRef = 6 => "PUSHVARREF",
        /// Assign to variable
        LvalVar = 7 => "LVALVAR",

        // ==================== Indexing ====================
        /// Index vector by int
        PushIdxI = 8 => "PUSHIDXI",
        /// Index vector by vector
        PushIdxV = 9 => "PUSHIDXV",
        /// Assign through int index
        LvalIdxI = 10 => "LVALIDXI",
        /// Assign through vector index
        LvalIdxV = 11 => "LVALIDXV",

        // ==================== Fields and locals ====================
        /// Read struct field
        PushFld = 12 => "PUSHFLD",
        /// Read struct field, nil-tolerant
        PushFldM = 13 => "PUSHFLDM",
        /// Assign struct field
        LvalFld = 14 => "LVALFLD",
        /// Read local slot
        PushLoc = 15 => "PUSHLOC",
        /// Assign local slot
        LvalLoc = 16 => "LVALLOC",

        // ==================== Calls ====================
        /// Call native function
        BCall = 17 => "BCALL",
        /// Call a single function
        Call = 18 => "CALL",
        /// Call a multi-method, followed by the static argument types
        CallMulti = 19 => "CALLMULTI",
        /// Call a function value
        CallV = 20 => "CALLV",
        /// Call a function value if non-nil
        CallVCond = 21 => "CALLVCOND",
        /// Function prologue
        FunStart = 22 => "FUNSTART",
        /// Function epilogue
        FunEnd = 23 => "FUNEND",
        /// Multi-method dispatch table
        FunMulti = 24 => "FUNMULTI",
        /// Return from function
        Return = 25 => "RETURN",

        // ==================== Stack ====================
        /// Construct vector or struct
        NewVec = 26 => "NEWVEC",
        /// Discard top
        Pop = 27 => "POP",
        /// Discard ref-counted top
        PopRef = 28 => "POPREF",
        /// Duplicate top
        Dup = 29 => "DUP",

        // ==================== Loops ====================
        /// Single-shot continuation
        Cont1 = 30 => "CONT1",
        /// Loop over int range
        IFor = 31 => "IFOR",
        /// Loop over string
        SFor = 32 => "SFOR",
        /// Loop over vector
        VFor = 33 => "VFOR",
        /// Loop over int range, ref-counted body value
        IForRef = 34 => "IFORREF",
        /// Loop over string, ref-counted body value
        SForRef = 35 => "SFORREF",
        /// Loop over vector, ref-counted body value
        VForRef = 36 => "VFORREF",

        // ==================== Jumps ====================
        /// Unconditional jump
        Jump = 37 => "JUMP",
        /// Jump if false
        JumpFail = 38 => "JUMPFAIL",
        /// Jump if false, keep value
        JumpFailR = 39 => "JUMPFAILR",
        /// Jump if false, push nil
        JumpFailN = 40 => "JUMPFAILN",
        /// Jump if true
        JumpNoFail = 41 => "JUMPNOFAIL",
        /// Jump if true, keep value
        JumpNoFailR = 42 => "JUMPNOFAILR",
        /// Ref-counted `JUMPFAIL`
        JumpFailRef = 43 => "JUMPFAILREF",
        /// Ref-counted `JUMPFAILR`
        JumpFailRRef = 44 => "JUMPFAILRREF",
        /// Ref-counted `JUMPFAILN`
        JumpFailNRef = 45 => "JUMPFAILNREF",
        /// Ref-counted `JUMPNOFAIL`
        JumpNoFailRef = 46 => "JUMPNOFAILREF",
        /// Ref-counted `JUMPNOFAILR`
        JumpNoFailRRef = 47 => "JUMPNOFAILRREF",

        // ==================== Integer arithmetic ====================
        /// Integer add
        IAdd = 48 => "IADD",
        /// Integer subtract
        ISub = 49 => "ISUB",
        /// Integer multiply
        IMul = 50 => "IMUL",
        /// Integer divide
        IDiv = 51 => "IDIV",
        /// Integer modulo
        IMod = 52 => "IMOD",
        /// Integer less than
        ILt = 53 => "ILT",
        /// Integer greater than
        IGt = 54 => "IGT",
        /// Integer less or equal
        ILe = 55 => "ILE",
        /// Integer greater or equal
        IGe = 56 => "IGE",
        /// Integer equal
        IEq = 57 => "IEQ",
        /// Integer not equal
        INe = 58 => "INE",

        // ==================== Float arithmetic ====================
        /// Float add
        FAdd = 59 => "FADD",
        /// Float subtract
        FSub = 60 => "FSUB",
        /// Float multiply
        FMul = 61 => "FMUL",
        /// Float divide
        FDiv = 62 => "FDIV",
        /// Float less than
        FLt = 63 => "FLT",
        /// Float greater than
        FGt = 64 => "FGT",
        /// Float less or equal
        FLe = 65 => "FLE",
        /// Float greater or equal
        FGe = 66 => "FGE",
        /// Float equal
        FEq = 67 => "FEQ",
        /// Float not equal
        FNe = 68 => "FNE",

        // ==================== Strings ====================
        /// String concatenation
        SAdd = 69 => "SADD",
        /// String equal
        SEq = 70 => "SEQ",
        /// String not equal
        SNe = 71 => "SNE",

        // ==================== Unary / conversions ====================
        /// Numeric negation
        UMinus = 72 => "UMINUS",
        /// Logical not
        LogNot = 73 => "LOGNOT",
        /// Logical not of ref-counted value
        LogNotRef = 74 => "LOGNOTREF",
        /// Int to float
        I2F = 75 => "I2F",
        /// Any to string
        A2S = 76 => "A2S",
        /// Any to bool
        E2B = 77 => "E2B",
        /// Ref-counted any to bool
        E2BRef = 78 => "E2BREF",

        // ==================== Misc ====================
        /// Runtime type test
        IsType = 79 => "ISTYPE",
        /// Create coroutine
        Coro = 80 => "CORO",
        /// Coroutine yield point
        CoCl = 81 => "COCL",
        /// Coroutine end
        CoEnd = 82 => "COEND",
        /// Read from the replay log
        LogRead = 83 => "LOGREAD",
        /// Read ref-counted value from the replay log
        LogReadRef = 84 => "LOGREADREF",
        /// Terminate program
        Exit = 85 => "EXIT",
        /// Abort with error
        Abort = 86 => "ABORT",
    }
}

word_enum! {
    /// Operation applied by an l-value (assignment) instruction
    pub enum LvalOp {
        /// Plain store
        Write = 0 => "WRITE",
        /// Store, keep value
        WriteR = 1 => "WRITER",
        /// Ref-counted store
        WriteRef = 2 => "WRITEREF",
        /// Ref-counted store, keep value
        WriteRRef = 3 => "WRITERREF",
        /// `+=` on int
        IAdd = 4 => "IADD",
        /// `+=` on int, keep value
        IAddR = 5 => "IADDR",
        /// `-=` on int
        ISub = 6 => "ISUB",
        /// `-=` on int, keep value
        ISubR = 7 => "ISUBR",
        /// `*=` on int
        IMul = 8 => "IMUL",
        /// `*=` on int, keep value
        IMulR = 9 => "IMULR",
        /// `/=` on int
        IDiv = 10 => "IDIV",
        /// `/=` on int, keep value
        IDivR = 11 => "IDIVR",
        /// `%=` on int
        IMod = 12 => "IMOD",
        /// `%=` on int, keep value
        IModR = 13 => "IMODR",
        /// `+=` on float
        FAdd = 14 => "FADD",
        /// `+=` on float, keep value
        FAddR = 15 => "FADDR",
        /// `-=` on float
        FSub = 16 => "FSUB",
        /// `-=` on float, keep value
        FSubR = 17 => "FSUBR",
        /// `*=` on float
        FMul = 18 => "FMUL",
        /// `*=` on float, keep value
        FMulR = 19 => "FMULR",
        /// `/=` on float
        FDiv = 20 => "FDIV",
        /// `/=` on float, keep value
        FDivR = 21 => "FDIVR",
        /// `+=` on string
        SAdd = 22 => "SADD",
        /// `+=` on string, keep value
        SAddR = 23 => "SADDR",
        /// Pre-increment int
        IPP = 24 => "IPP",
        /// Pre-increment int, keep value
        IPPR = 25 => "IPPR",
        /// Pre-decrement int
        IMM = 26 => "IMM",
        /// Pre-decrement int, keep value
        IMMR = 27 => "IMMR",
        /// Post-increment int
        IPPP = 28 => "IPPP",
        /// Post-increment int, keep value
        IPPPR = 29 => "IPPPR",
        /// Post-decrement int
        IMMP = 30 => "IMMP",
        /// Post-decrement int, keep value
        IMMPR = 31 => "IMMPR",
        /// Pre-increment float
        FPP = 32 => "FPP",
        /// Pre-increment float, keep value
        FPPR = 33 => "FPPR",
        /// Pre-decrement float
        FMM = 34 => "FMM",
        /// Pre-decrement float, keep value
        FMMR = 35 => "FMMR",
        /// Post-increment float
        FPPP = 36 => "FPPP",
        /// Post-increment float, keep value
        FPPPR = 37 => "FPPPR",
        /// Post-decrement float
        FMMP = 38 => "FMMP",
        /// Post-decrement float, keep value
        FMMPR = 39 => "FMMPR",
    }
}
