use std::fs::File;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use exfat_reader::VolumeReader;

#[derive(Parser)]
#[command(name = "exfat-boot-header")]
#[command(about = "Print the boot-sector header of an exFAT image")]
struct Args {
    /// File-path of the exFAT filesystem image
    #[arg(short, long)]
    filesystem: PathBuf,
}

fn main() {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            process::exit(1);
        }
    };

    if let Err(err) = run(&args) {
        eprintln!("{err}");
        process::exit(-1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::open(&args.filesystem)?;

    let mut er = VolumeReader::new(file);
    er.parse()?;

    er.boot_header()?.dump();

    Ok(())
}
