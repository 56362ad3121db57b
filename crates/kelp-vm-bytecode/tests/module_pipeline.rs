//! End-to-end tests: build, container round trip, verification, disassembly

use kelp_vm_bytecode::{
    CodecConfig, ContainerCodec, ContainerError, Cursor, FunctionInfo, Ident, Instruction, LineInfo, LineTable,
    LvalOp, Module, ModuleVerifier, NativeRegistry, Opcode, StructIndex, StructInfo, TypeDescriptor, TypeIndex,
    disassemble,
};

fn w(op: Opcode) -> i32 {
    op.to_word()
}

fn demo_module() -> Module {
    let mut b = Module::builder();
    b.add_file("demo.kelp");
    let main = b.add_function(FunctionInfo::new("main", 0));
    let helper = b.add_function(FunctionInfo::new("helper", 40));
    let x = b.add_variable(Ident::new("x"), TypeIndex::INT);
    let y = b.add_variable(Ident::new("y"), TypeIndex::FLOAT);
    b.add_struct(StructInfo::new("Point", ["x", "y"]));
    let point = b.add_type(TypeDescriptor::Struct {
        struct_id: StructIndex(0),
        fields: vec![TypeIndex::INT, TypeIndex::FLOAT],
    });

    b.emit_line(1, [w(Opcode::FunStart), 1, x.index() as i32, 1, y.index() as i32, 0]);
    b.emit_line(2, [w(Opcode::PushFlt), 2.5f32.to_bits() as i32]);
    b.emit_line(3, [w(Opcode::PushStr), 'h' as i32, 'i' as i32, 0]);
    b.emit([w(Opcode::LvalVar), LvalOp::Write.to_word(), x.index() as i32]);
    b.emit_line(4, [w(Opcode::NewVec), point.index() as i32, 2]);
    b.emit([w(Opcode::BCall), 0]);
    b.emit([w(Opcode::CallMulti), 2, helper.index() as i32, 40, 3, 9, 9]);
    b.emit_line(5, [w(Opcode::Coro), 50, 0, 2, 4, 5]);
    b.emit([w(Opcode::FunMulti), 2, 1, 0, 0, 0, 0, 0, 0]);
    b.emit([w(Opcode::LvalFld), LvalOp::IAdd.to_word(), 1]);
    b.emit_line(6, [w(Opcode::CallV), 1, 2]);
    b.emit([w(Opcode::Return), main.index() as i32, 0, 0]);
    b.emit([w(Opcode::FunEnd)]);
    b.build().unwrap()
}

#[test]
fn test_every_instruction_ends_where_the_next_begins() {
    let module = demo_module();
    let mut cur = Cursor::new(&module.instructions);
    let mut ops = Vec::new();
    while !cur.is_at_end() {
        ops.push(Instruction::decode(&mut cur).unwrap().opcode());
    }
    assert_eq!(cur.position(), module.instructions.len());
    assert_eq!(
        ops,
        vec![
            Opcode::FunStart,
            Opcode::PushFlt,
            Opcode::PushStr,
            Opcode::LvalVar,
            Opcode::NewVec,
            Opcode::BCall,
            Opcode::CallMulti,
            Opcode::Coro,
            Opcode::FunMulti,
            Opcode::LvalFld,
            Opcode::CallV,
            Opcode::Return,
            Opcode::FunEnd,
        ]
    );
}

#[test]
fn test_disassembly_listing() {
    let module = demo_module();
    let natives: NativeRegistry = ["print"].into_iter().collect();
    let text = disassemble(&module, &natives).unwrap();
    let expected = [
        "I 0 \tL 1 \tFUNSTART x => y ",
        "I 6 \tL 2 \tPUSHFLT 2.500000",
        "I 8 \tL 3 \tPUSHSTR \"hi\"",
        "I 12 \tL 3 \tLVALVAR WRITE x",
        "I 15 \tL 4 \tNEWVEC Point 2",
        "I 18 \tL 4 \tBCALL print",
        "I 20 \tL 4 \tCALLMULTI 2 helper 40 m:3",
        "I 27 \tL 5 \tCORO 50 v4 v5",
        "I 33 \tL 5 \tFUNMULTI 2 1",
        "I 42 \tL 5 \tLVALFLD IADD 1",
        "I 45 \tL 6 \tCALLV 1 m:2",
        "I 48 \tL 6 \tRETURN main",
        "I 52 \tL 6 \tFUNEND ",
    ];
    assert_eq!(text.lines().collect::<Vec<_>>(), expected);
    assert!(text.ends_with('\n'));
}

#[test]
fn test_container_roundtrip_preserves_module() {
    let module = demo_module();
    let codec = ContainerCodec::new(CodecConfig::default());
    let bytes = codec.save_module(&module).unwrap();
    assert_eq!(bytes[..4], [0xA5, 0x74, 0xEF, 0x19]);

    let restored = codec.load_module(&bytes).unwrap();
    assert_eq!(restored, module);

    let raw = codec
        .load_verified(&bytes, &ModuleVerifier::with_natives(&["print"].into_iter().collect()))
        .unwrap();
    assert_eq!(Module::from_bytes(&raw).unwrap(), module);
}

#[test]
fn test_truncated_stream_rejected_on_load() {
    let mut module = demo_module();
    module.instructions.truncate(10);
    let codec = ContainerCodec::new(CodecConfig::fast());
    let bytes = codec.save_module(&module).unwrap();
    assert!(matches!(codec.load_module(&bytes), Err(ContainerError::Verify(_))));

    assert!(matches!(
        codec.load_verified(&bytes, &ModuleVerifier::new()),
        Err(ContainerError::Verify(_))
    ));
}

#[test]
fn test_every_load_path_verifies() {
    let mut b = Module::builder();
    b.add_function(FunctionInfo::new("main", 0));
    b.emit_line(1, [w(Opcode::Call), 1]);
    let module = b.build().unwrap();

    for level in [0, 1, 9] {
        let codec = ContainerCodec::new(CodecConfig::new().compression_level(level));
        let bytes = codec.save_module(&module).unwrap();
        assert!(matches!(codec.load_module(&bytes), Err(ContainerError::Verify(_))));
        assert!(matches!(
            codec.load_verified(&bytes, &ModuleVerifier::new()),
            Err(ContainerError::Verify(_))
        ));
    }
}

#[test]
fn test_line_lookup_boundaries() {
    let table = LineTable::new(vec![LineInfo::new(0, 1), LineInfo::new(10, 2), LineInfo::new(25, 5)]).unwrap();
    let cases = [(0, 1), (9, 1), (10, 2), (24, 2), (25, 5), (1000, 5)];
    for (offset, line) in cases {
        assert_eq!(table.lookup_line(offset), line, "offset {offset}");
    }
}
