use bytec_asm::{
    assemble, assemble_mnemonic, disassemble, ExecuteState, Fault, Instruction, InstructionSet,
};
use quickcheck_macros::quickcheck;
use rstest::rstest;

fn nop(_: &mut ()) -> Result<ExecuteState, Fault> {
    Ok(ExecuteState::Proceed)
}

fn sample_set() -> InstructionSet<()> {
    let mut set = InstructionSet::new();
    for mnemonic in [
        "EXIT",
        "OUT",
        "LDA #val",
        "STA FP, #offset",
        "STA FP, -#offset",
        "TEST #a, #b",
    ] {
        set.register(Instruction::new(mnemonic, nop)).unwrap();
    }
    set
}

#[quickcheck]
fn encoded_length_is_one_plus_operand_count(a: u8, b: u8) {
    let set = sample_set();

    for instruction in set.instructions() {
        let operands: Vec<(&str, u8)> = instruction
            .operands()
            .zip([a, b])
            .collect();
        let encoded = instruction.build(&operands).unwrap();

        assert_eq!(encoded.len(), instruction.size());
        assert_eq!(encoded.len(), 1 + operands.len());
        assert_eq!(encoded[0], instruction.id().unwrap());
    }
}

#[quickcheck]
fn disassembly_reassembles_to_the_same_bytes(script: Vec<(u8, u8, u8)>) {
    let set = sample_set();
    let count = set.len() as u8;

    let mut image = Vec::new();
    for (which, a, b) in script {
        let instruction = set.get(which % count).unwrap();
        let operands: Vec<(&str, u8)> = instruction.operands().zip([a, b]).collect();
        image.extend(instruction.build(&operands).unwrap());
    }

    let listing = disassemble(&set, &image).unwrap();
    let reassembled = assemble(&set, &listing.join("\n")).unwrap();

    assert_eq!(reassembled, image);
}

#[rstest]
#[case("exit", vec![0])]
#[case("EXIT", vec![0])]
#[case("lda #9", vec![2, 9])]
#[case("sta fp, #3", vec![3, 3])]
#[case("STA FP, -#3", vec![4, 3])]
#[case("test #1, #2", vec![5, 1, 2])]
fn assembles_against_the_sample_table(#[case] line: &str, #[case] expected: Vec<u8>) {
    let set = sample_set();
    assert_eq!(assemble_mnemonic(&set, line).unwrap(), expected);
}
