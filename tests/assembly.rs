use botcore_rs::asm::{assemble, AssembleError, AssembledImage};
use botcore_rs::isa::Opcode;
use botcore_rs::parser::parse;
use botcore_rs::text::SourceText;

fn build(src: &str) -> Result<AssembledImage, AssembleError> {
    let (prog, diags) = parse(&SourceText::new(src));
    assert!(diags.is_clean(), "{:?}", diags.errors);
    assemble(&prog)
}

fn image(src: &str) -> AssembledImage {
    build(src).unwrap()
}

#[test]
fn emission_starts_at_address_zero() {
    let img = image("nop\n");
    assert_eq!(img.memory.read_u8(0), Opcode::Nop as u8);
}

#[test]
fn forward_reference_is_back_patched() {
    // jmp @x encodes as opcode + 16-bit address; x lands right after it.
    let img = image("jmp @x\nx: nop\n");
    assert_eq!(img.memory.read_u8(0), Opcode::JmpI as u8);
    assert_eq!(img.memory.read_u16(1), 3);
    assert_eq!(img.memory.read_u8(3), Opcode::Nop as u8);
}

#[test]
fn backward_reference_resolves_too() {
    let img = image("top: nop\njmp @top\n");
    assert_eq!(img.memory.read_u16(2), 0);
}

#[test]
fn data_bytes_are_emitted_verbatim_at_the_label() {
    let img = image("ldw $x0, @table\ntable@0x0100:\n.data 12 34\n");
    assert_eq!(img.memory.read_u16(1), 0x0100); // patched operand
    assert_eq!(img.memory.read_u8(0x0100), 0x12);
    assert_eq!(img.memory.read_u8(0x0101), 0x34);
}

#[test]
fn explicit_address_moves_the_cursor_forward_only() {
    let img = image("@0x0200:\nnop\n");
    assert_eq!(img.memory.read_u8(0x0200), Opcode::Nop as u8);

    let err = build("nop\n@0x0000:\nnop\n").unwrap_err();
    assert!(matches!(err, AssembleError::AddressTooLow { addr: 0, .. }));
}

#[test]
fn label_collisions_are_rejected() {
    let err = build("a: nop\na: nop\n").unwrap_err();
    assert!(matches!(err, AssembleError::DuplicateLabel { .. }));

    let err = build("a:\nb:\nnop\n").unwrap_err();
    assert!(matches!(err, AssembleError::MultipleLabels { .. }));
}

#[test]
fn unbound_labels_are_rejected() {
    let err = build("jmp @nowhere\n").unwrap_err();
    assert!(matches!(err, AssembleError::UndefinedLabel { ref name, .. } if name == "nowhere"));

    let err = build("nop\nend:\n").unwrap_err();
    assert!(matches!(err, AssembleError::DanglingLabel { ref name, .. } if name == "end"));
}

#[test]
fn emission_cannot_run_past_the_address_space() {
    let err = build("@0xFFFF:\nset $x0, 1\n").unwrap_err();
    assert!(matches!(err, AssembleError::MemoryOverflow { .. }));

    // A single byte at the very top still fits.
    assert!(build("@0xFFFF:\nnop\n").is_ok());
}

#[test]
fn operand_shapes_select_distinct_opcodes() {
    let img = image("sub $x0, $x1, $x2\nsub $x0, $x1, 5\nsub $x0, 5, $x1\n");
    assert_eq!(img.memory.read_u8(0), Opcode::SubRrr as u8);
    assert_eq!(img.memory.read_u8(3), Opcode::SubRri as u8);
    assert_eq!(img.memory.read_u8(7), Opcode::SubRir as u8);
}

#[test]
fn negative_immediates_encode_twos_complement() {
    let img = image("set $x0, -1\n");
    assert_eq!(img.memory.read_u16(1), 0xFFFF);
}

#[test]
fn arity_mismatch_has_no_overload() {
    let err = build("nop $x0\n").unwrap_err();
    assert!(matches!(err, AssembleError::NoMatchingOverload { .. }));
    let err = build("add $x0, $x1\n").unwrap_err();
    assert!(matches!(err, AssembleError::NoMatchingOverload { .. }));
}
