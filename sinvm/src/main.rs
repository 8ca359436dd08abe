use clap::Parser;
use color_print::cprintln;
use sinvm::SinVm;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[clap(name = "sinvm", version, about = "Virtual machine for SIN executable images")]
struct Args {
    /// Executable image produced by the linker
    image: PathBuf,

    /// Dump registers and the top of the data stack after the run
    #[clap(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let file = match File::open(&args.image) {
        Ok(f) => f,
        Err(e) => {
            cprintln!("<red,bold>error</>: {}: {}", args.image.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let mut vm = match SinVm::load(&mut BufReader::new(file)) {
        Ok(vm) => vm,
        Err(e) => {
            cprintln!("<red,bold>error</>: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = vm.run();
    if args.verbose {
        dump(&vm);
    }
    match result {
        Ok(()) => ExitCode::from(vm.exit_code as u8),
        Err(e) => {
            cprintln!("<red,bold>vm error</>: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn dump(vm: &SinVm) {
    cprintln!("<bold>registers</>");
    cprintln!("  A: <yellow>${:04X}</>  B: <yellow>${:04X}</>", vm.a, vm.b);
    cprintln!("  X: <yellow>${:04X}</>  Y: <yellow>${:04X}</>", vm.x, vm.y);
    cprintln!(
        "  PC: <yellow>${:04X}</>  SP: <yellow>${:04X}</>  CALL_SP: <yellow>${:04X}</>",
        vm.pc,
        vm.sp,
        vm.call_sp
    );
    cprintln!("  STATUS: <yellow>%{:08b}</>", vm.status.0);

    cprintln!("<bold>data stack (top page)</>");
    let mut addr = arch::mem::STACK_TOP;
    for _ in 0..8 {
        addr -= 1;
        cprintln!("  ${:04X}: ${:04X}", addr, vm.read_word(addr));
        if addr <= vm.sp {
            break;
        }
        addr -= 1;
    }

    if !vm.heap.objects().is_empty() {
        cprintln!("<bold>heap objects</>");
        for object in vm.heap.objects() {
            cprintln!("  ${:04X} +{}", object.start, object.size);
        }
    }
}
