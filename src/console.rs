// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use spin::{Once, mutex::SpinMutex};
use std::fmt;
use std::io::{self, Stderr, Write};

static CONSOLE: Once<SharedConsole<Stderr>> = Once::new();

/// A diagnostic stream guarded by a spin mutex.
///
/// Each formatted write holds the lock until it completes, so lines written
/// with a single `writeln!` never interleave.
pub struct SharedConsole<T: Send> {
    pub console: SpinMutex<T>,
}

impl<T: Send> SharedConsole<T> {
    pub const fn new(console: T) -> Self {
        Self {
            console: SpinMutex::new(console),
        }
    }
}

impl<T: Send + Write> Write for &SharedConsole<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.console.lock().write(buf)
    }

    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> io::Result<()> {
        self.console.lock().write_fmt(args)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.console.lock().flush()
    }
}

/// Initialises the shared console on standard error.
///
/// Repeated calls return the same console.
pub fn init() -> &'static SharedConsole<Stderr> {
    CONSOLE.call_once(|| SharedConsole::new(io::stderr()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_through_the_lock() {
        let console = SharedConsole::new(Vec::new());
        writeln!(&console, "[INFO] one").unwrap();
        write!(&console, "[WARN] two").unwrap();
        assert_eq!(*console.console.lock(), b"[INFO] one\n[WARN] two");
    }

    #[test]
    fn lines_from_threads_stay_whole() {
        let console = SharedConsole::new(Vec::new());
        std::thread::scope(|scope| {
            for thread in 0..4 {
                let console = &console;
                scope.spawn(move || {
                    for line in 0..100 {
                        writeln!(&*console, "[INFO] thread {thread} line {line}").unwrap();
                    }
                });
            }
        });

        let output = String::from_utf8(console.console.lock().clone()).unwrap();
        assert_eq!(output.lines().count(), 400);
        for line in output.lines() {
            let rest = line.strip_prefix("[INFO] thread ").unwrap();
            let (thread, line) = rest.split_once(" line ").unwrap();
            assert!(thread.parse::<u32>().unwrap() < 4);
            assert!(line.parse::<u32>().unwrap() < 100);
        }
    }
}
