use std::path::PathBuf;
use weight_cast::{ckpt, container, CastError};

fn main() {
    let mut args = std::env::args();
    let _ = args.next().unwrap();
    let src = args.next().map(PathBuf::from).expect(USAGE_HELP);
    let dst = args.next().map(PathBuf::from).expect(USAGE_HELP);

    println!("Loading {}", src.display());
    let weights = container::read(&src).unwrap_or_else(|e| fatal(&e));
    println!("Saving {}", dst.display());
    ckpt::write(&dst, &weights).unwrap_or_else(|e| fatal(&e));
}

const USAGE_HELP: &str = "\
Usage: safetensors_to_ckpt <safetensors> <checkpoint>
";

fn fatal(e: &CastError) -> ! {
    eprintln!("{e}");
    std::process::exit(1);
}
