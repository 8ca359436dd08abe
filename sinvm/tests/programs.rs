//! Whole programs assembled with `sinasm` and executed on the VM.

use arch::status::Flag;
use sinvm::SinVm;

fn run(source: &str) -> SinVm {
    let object = sinasm::assemble(source).expect("assembles");
    let image = sinasm::link(&[object]).expect("links");
    let mut vm = SinVm::new(&image.bytes, image.entry).expect("loads");
    vm.run().expect("runs to halt");
    vm
}

#[test]
fn store_absolute_load_x_indexed() {
    // store $ABCD at $1000 with absolute mode, read back x-indexed, X = 0
    let vm = run("\
\tloada #$abcd
\tstorea $1000
\tloadx #$0000
\tloada $1000, x
\thalt
");
    assert_eq!(vm.a, 0xABCD);
}

#[test]
fn load_store_roundtrip_across_the_map() {
    for addr in [0x0002u16, 0x0100, 0x0400, 0x1000, 0x1800, 0xF000, 0xFF00] {
        let vm = run(&format!(
            "\tloada #$a5c3\n\tstorea ${:04x}\n\tloadb ${:04x}\n\thalt\n",
            addr, addr
        ));
        assert_eq!(vm.b, 0xA5C3, "round-trip through ${:04X}", addr);
    }
}

#[test]
fn lsl_register_a() {
    // scenario 5: loada #$ff; lsl A -> $fe with carry
    let vm = run("\tloada #$ff\n\tlsl A\n\thalt\n");
    assert_eq!(vm.a, 0xFE);
    assert!(vm.status.is_set(Flag::C));
}

#[test]
fn short_mode_branch_never_reaches_the_vm() {
    // the not-taken path always skips a three-byte payload, so a short
    // branch encoding must die at assembly time
    assert!(sinasm::assemble("\tloada #$0001\n\tcmpa #$0001\n\tbrne <$80\n\thalt\n").is_err());
}

#[test]
fn countdown_loop() {
    // x counts 5 down to 0, a accumulates the iterations
    let vm = run("\
\tloadx #$0005
\tloada #$0000
loop:
\tcmpx #$0000
\tbreq done
\tclc
\taddca #$0001
\tdecx
\tjmp loop
done:
\thalt
");
    assert_eq!(vm.a, 5);
    assert_eq!(vm.x, 0);
}

#[test]
fn subroutine_call_and_return() {
    let vm = run("\
\tjsr double
\tjsr double
\thalt
double:
\tclc
\taddca #$0001
\trts
");
    assert_eq!(vm.a, 2);
    assert_eq!(vm.call_sp, arch::mem::CALL_STACK_TOP);
}

#[test]
fn rs_global_survives_a_subroutine() {
    let vm = run("\
@rs counter 2
\tloada #$0007
\tstorea counter
\tjsr bump
\tloada counter
\thalt
bump:
\tloadb counter
\tincb
\tstoreb counter
\trts
");
    assert_eq!(vm.a, 8);
    // the reservation lives in the global-static region
    assert_eq!(vm.read_word(arch::mem::RS_START), 8);
}

#[test]
fn data_entry_is_addressable() {
    let vm = run("\
@db message \"ok\"
\tloadb message
\thalt
");
    // the length prefix of the stored string
    assert_eq!(vm.b, 2);
}

#[test]
fn macro_constant_feeds_an_immediate() {
    let vm = run("@macro answer $2a\n\tloada #answer\n\thalt\n");
    assert_eq!(vm.a, 0x2A);
}

#[test]
fn stack_discipline_across_pushes() {
    let vm = run("\
\tloada #$1111
\tpha
\tloada #$2222
\tpha
\tplb
\tpla
\thalt
");
    assert_eq!(vm.b, 0x2222);
    assert_eq!(vm.a, 0x1111);
    assert_eq!(vm.sp, arch::mem::STACK_TOP);
}

#[test]
fn allocate_free_reallocate_heap_scenario() {
    // scenario 3: alloc 16, free, realloc 32 -> B = $0400, one object
    let vm = run(&format!(
        "\
\tloada #$0010
\tsyscall #${alloc:02x}
\tsyscall #${free:02x}
\tloada #$0020
\tsyscall #${realloc:02x}
\thalt
",
        alloc = arch::syscall::ALLOC,
        free = arch::syscall::FREE,
        realloc = arch::syscall::REALLOC,
    ));
    assert_eq!(vm.b, 0x0400);
    assert_eq!(vm.heap.objects().len(), 1);
    assert_eq!(vm.heap.objects()[0].start, 0x0400);
    assert_eq!(vm.heap.objects()[0].size, 0x20);
}
