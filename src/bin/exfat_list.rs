use std::fs::File;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use exfat_reader::{Tree, VolumeReader};

#[derive(Parser)]
#[command(name = "exfat-list")]
#[command(about = "List the contents of an exFAT image")]
struct Args {
    /// File-path of the exFAT filesystem image
    #[arg(short, long)]
    filesystem: PathBuf,

    /// Filename filter (supports `*` and `?`)
    #[arg(short, long)]
    pattern: Option<String>,

    /// Show additional entry detail
    #[arg(short, long)]
    detail: bool,
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

    let mut tree = Tree::new(&mut er);
    tree.load()?;

    let (files, nodes) = tree.list()?;

    for current_path in &files {
        let node = nodes[current_path];

        if let Some(pattern) = &args.pattern {
            // Paths are separated by Windows-style backslashes, so match
            // against the node's own name rather than splitting the path.
            if !glob_match(pattern, node.name()) {
                continue;
            }
        }

        if args.detail {
            println!("## {current_path}");
            println!();

            if let Some(set) = node.indexed_entry_set() {
                println!("[Primary Entry]");
                println!("{}", set.primary);
                println!();

                for secondary in &set.secondaries {
                    println!("[Secondary Entry] {secondary}");
                }
                println!();
            }
        } else {
            let size = node
                .stream_directory_entry()
                .map(|stream| stream.valid_data_length())
                .unwrap_or(0);
            let mtime = node
                .file_directory_entry()
                .map(|fde| fde.last_modified_timestamp().to_string())
                .unwrap_or_default();

            println!("{:>15} {:>30} {}", comma_separated(size), mtime, current_path);
        }
    }

    Ok(())
}

/// Matches `name` against a glob pattern supporting `*` and `?`.
fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    // (pattern index, name index) pairs still to try, newest first.
    let mut stack = vec![(0usize, 0usize)];

    while let Some((mut p, mut n)) = stack.pop() {
        loop {
            match pattern.get(p) {
                None => {
                    if n == name.len() {
                        return true;
                    }
                    break;
                }
                Some('*') => {
                    if n < name.len() {
                        stack.push((p, n + 1));
                    }
                    p += 1;
                }
                Some('?') => {
                    if n >= name.len() {
                        break;
                    }
                    p += 1;
                    n += 1;
                }
                Some(&c) => {
                    if name.get(n) != Some(&c) {
                        break;
                    }
                    p += 1;
                    n += 1;
                }
            }
        }
    }

    false
}

/// Formats an integer with thousands separators.
fn comma_separated(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}
