/// Round-trip tests for the persisted TOML form.
use reasm64::code_buffer::CodeBuffer;
use reasm64::code_type::CodeType;
use reasm64::command_buffer::{CommandBuffer, Subroutine};
use reasm64::persist::{load, save};
use reasm64::reassembler::Reassembler;

fn annotated_session() -> Reassembler {
    let mut reassembler = Reassembler::new();
    reassembler.set_commands(CommandBuffer::new((1..=10).collect(), 0x0801));
    reassembler
        .commands_mut()
        .set_type_range(1, 3, CodeType::Code);
    reassembler.commands_mut().add_subroutine(Subroutine {
        address: 4,
        length: 2,
    });
    reassembler
}

#[test]
fn test_serialization_is_canonical() {
    let saved = save(&annotated_session()).unwrap();
    let saved_again = save(&load(&saved).unwrap()).unwrap();
    assert_eq!(saved, saved_again);

    // and stable across a second cycle
    let saved_thrice = save(&load(&saved_again).unwrap()).unwrap();
    assert_eq!(saved_again, saved_thrice);
}

#[test]
fn test_round_trip_preserves_classification() {
    let original = annotated_session();
    let restored = load(&save(&original).unwrap()).unwrap();

    assert_eq!(original.commands().len(), restored.commands().len());
    for index in 0..original.commands().len() {
        assert_eq!(
            original.commands().get_type(index),
            restored.commands().get_type(index),
            "type at index {}",
            index
        );
    }
    assert_eq!(
        original.commands().subroutines(),
        restored.commands().subroutines()
    );
}

#[test]
fn test_full_session_round_trips() {
    // analyze a real image, persist it, restore it, compare the listings
    let code = vec![
        0xA9, 0x00, // LDA #$00
        0x20, 0x08, 0x08, // JSR $0808
        0x4C, 0x02, 0x08, // JMP $0802
        0xEE, 0x20, 0xD0, // $0808: INC $D020
        0x60, // RTS
    ];
    let mut reassembler = Reassembler::new();
    reassembler.reassemble(CodeBuffer::new(0x0800, code));

    let saved = save(&reassembler).unwrap();
    let mut restored = load(&saved).unwrap();
    restored.run();

    let mut original_listing = String::new();
    reasm64::writer::write_listing(reassembler.commands(), &mut original_listing).unwrap();
    let mut restored_listing = String::new();
    reasm64::writer::write_listing(restored.commands(), &mut restored_listing).unwrap();
    assert_eq!(original_listing, restored_listing);

    // the detector pipeline came back with the document
    assert_eq!(save(&restored).unwrap(), saved);
}

#[test]
fn test_load_rejects_garbage() {
    assert!(load("definitely not toml [").is_err());
    assert!(load("detectors = [\"nope\"]\n[code]\nstart = \"1000\"\nbytes = \"\"\n").is_err());
}

#[test]
fn test_load_rejects_corrupt_documents() {
    let saved = save(&annotated_session()).unwrap();

    // a rebase entry outside the 10-byte image
    let out_of_bounds = saved.replace(
        "[[addresses]]\nindex = \"000A\"",
        "[[addresses]]\nindex = \"0100\"\nbase = \"2000\"\n\n[[addresses]]\nindex = \"000A\"",
    );
    assert_ne!(out_of_bounds, saved);
    assert!(load(&out_of_bounds).is_err());

    // a second subroutine at an already recorded address
    let duplicated = format!(
        "{}\n[[subroutines]]\naddress = \"0004\"\nlength = \"0002\"\n",
        saved
    );
    assert!(load(&duplicated).is_err());
}
