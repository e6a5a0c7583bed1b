use std::io;
use std::mem::MaybeUninit;
use std::process;
use std::ptr;

use chal2_bin::layout::{FLAG_CAP, FLAG_PATH, INTAKE_CAP, READ_LIMIT, TOKEN_CAP};

// glibc's stream objects; setvbuf and fgets want the FILE, not the fd
extern "C" {
    #[link_name = "stdin"]
    static mut STDIN: *mut libc::FILE;
    #[link_name = "stdout"]
    static mut STDOUT: *mut libc::FILE;
}

// nothing in the program calls this; the only way in is the intake
// overflow. the unmangled symbol stays visible to nm for solvers.
#[no_mangle]
#[inline(never)]
pub extern "C" fn win() -> ! {
    let mut flag = [0u8; FLAG_CAP];

    unsafe {
        let fd = libc::open(FLAG_PATH.as_ptr(), libc::O_RDONLY);
        if fd < 0 {
            libc::puts(c"flag missing".as_ptr());
            libc::_exit(1);
        }

        let n = libc::read(fd, flag.as_mut_ptr().cast(), FLAG_CAP - 1);
        if n > 0 {
            // raw bytes straight to the fd, no text path
            libc::write(libc::STDOUT_FILENO, flag.as_ptr().cast(), n as usize);
        }

        libc::close(fd);
        libc::_exit(0)
    }
}

// one read of up to 512 bytes into a 64-byte frame buffer. bytes past the
// buffer land on the saved frame state, which takes effect at the ret.
#[no_mangle]
#[inline(never)]
fn vuln() {
    let mut buf = MaybeUninit::<[u8; INTAKE_CAP]>::uninit();

    unsafe {
        libc::puts(c"Send your payload:".as_ptr());
        let _ = libc::read(libc::STDIN_FILENO, buf.as_mut_ptr().cast(), READ_LIMIT);
        libc::puts(c"bye".as_ptr());
    }
}

fn greet() -> io::Result<()> {
    let mut team_id = [0u8; TOKEN_CAP];

    unsafe {
        libc::puts(c"TEAM ID?".as_ptr());
        if libc::fgets(team_id.as_mut_ptr().cast(), TOKEN_CAP as libc::c_int, STDIN).is_null() {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }

        // fgets keeps the newline; clip the token there
        let end = libc::strcspn(team_id.as_ptr().cast(), c"\n".as_ptr());
        team_id[end] = 0;

        // the token is an argument, never the format
        libc::printf(c"Hello, team %s!\n".as_ptr(), team_id.as_ptr());
    }

    Ok(())
}

fn main() {
    unsafe {
        // process-wide policy: every byte crosses the stream the moment
        // stdio sees it, and reads pull exactly what they ask for
        libc::setvbuf(STDOUT, ptr::null_mut(), libc::_IONBF, 0);
        libc::setvbuf(STDIN, ptr::null_mut(), libc::_IONBF, 0);
    }

    // keep the uncalled win in the linked image
    std::hint::black_box(win as usize);

    if greet().is_err() {
        process::exit(1);
    }

    vuln();
}
