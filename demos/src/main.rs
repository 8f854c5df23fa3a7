//! Audition RL Demos
//!
//! ```bash
//! # Random agent fills a disk buffer, then episode-balanced batches are drawn
//! cargo run --release -p audition_rl_demos -- fill-and-sample
//! ```

mod fill_and_sample;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        let result = match args[1].as_str() {
            // Disk buffer -> weighted sampler -> burn DataLoader
            "fill-and-sample" => fill_and_sample::run(),

            _ => {
                println!("Unknown demo: {}", args[1]);
                println!();
                print_usage();
                return;
            }
        };
        if let Err(e) = result {
            eprintln!("Demo failed: {}", e);
            std::process::exit(1);
        }
    } else {
        print_usage();
    }
}

fn print_usage() {
    println!("Usage: cargo run --release -p audition_rl_demos -- <demo>");
    println!();
    println!("  fill-and-sample    Random agent fills a disk-backed replay buffer,");
    println!("                     samples it episode-balanced and collates batches");
    println!("                     of [batch, frames, channels] mixes (NdArray backend)");
}
