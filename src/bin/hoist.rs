use std::env;

fn print_usage() {
    eprintln!("Usage: hoist [OPTIONS] <SERVER_URL> [PATH]...");
    eprintln!();
    eprintln!("Uploads files (and directories, recursively) to a file server");
    eprintln!("that accepts PUT uploads and PATCH append resumes.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -j, --concurrent <N>   Maximum simultaneous uploads (default: 1)");
    eprintln!("      --no-verify        Skip the one-shot session verification");
    eprintln!("  -y, --yes              Answer yes to every prompt");
    eprintln!("      --delete <PATH>    Delete a remote path and exit");
    eprintln!("      --mkdir <PATH>     Create a remote directory and exit");
    eprintln!("      --touch <PATH>     Create an empty remote file and exit");
    eprintln!("      --move <FROM> <TO> Move a remote path and exit");
    eprintln!("  -h, --help             Show this help");
}

#[tokio::main]
async fn main() -> hoist::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage();
        std::process::exit(i32::from(args.is_empty()));
    }

    #[cfg(feature = "cli")]
    {
        hoist::cli::run().await
    }
    #[cfg(not(feature = "cli"))]
    {
        eprintln!("CLI support not compiled in");
        std::process::exit(1);
    }
}
