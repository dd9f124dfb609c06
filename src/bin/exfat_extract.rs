use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;

use exfat_reader::{StreamExtensionEntry, Tree, VolumeReader};

#[derive(Parser)]
#[command(name = "exfat-extract")]
#[command(about = "Extract one file from an exFAT image")]
struct Args {
    /// File-path of the exFAT filesystem image
    #[arg(short, long)]
    filesystem: PathBuf,

    /// File-path to extract (use backslash-separated components)
    #[arg(short, long)]
    extract_filepath: String,

    /// File-path to write to ('-' for STDOUT)
    #[arg(short, long)]
    output_filepath: String,
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

    // List once and look the requested path up verbatim; this avoids any
    // reinterpretation of preexisting slashes in the path the user provides.
    let stream: StreamExtensionEntry = {
        let mut tree = Tree::new(&mut er);
        tree.load()?;

        let (_, nodes) = tree.list()?;
        match nodes
            .get(&args.extract_filepath)
            .and_then(|node| node.stream_directory_entry())
        {
            Some(stream) => *stream,
            None => {
                println!("File not found.");
                process::exit(2);
            }
        }
    };

    let use_fat = !stream.general_secondary_flags().no_fat_chain();
    let data_size = stream.valid_data_length();

    let written = if args.output_filepath == "-" {
        let stdout = io::stdout();
        let mut sink = stdout.lock();
        er.write_from_cluster_chain(stream.first_cluster(), data_size, use_fat, &mut sink)?
    } else {
        let mut sink = File::create(&args.output_filepath)?;
        let written =
            er.write_from_cluster_chain(stream.first_cluster(), data_size, use_fat, &mut sink)?;
        sink.flush()?;
        written
    };

    if args.output_filepath != "-" {
        println!("({written}) bytes written.");
    }

    Ok(())
}
