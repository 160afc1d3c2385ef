/*!
 * Process Core - Demo Entry Point
 *
 * Boots the process subsystem and walks through a small scenario:
 * a root, two descendants, a cross-thread terminate observed by a
 * blocking wait, and a JSON listing of what remains.
 */

use anyhow::Result;
use kproc::{ProcessLifecycle, WaitTarget};
use log::info;
use std::thread;

fn main() -> Result<()> {
    env_logger::init();

    let lifecycle = ProcessLifecycle::new();

    let init = lifecycle.create_root("init")?;
    let shell = lifecycle.create("shell", init)?;
    let worker = lifecycle.create("worker", shell)?;
    info!(
        "Process tree ready: init={}, shell={}, worker={}",
        init, shell, worker
    );

    // Terminate the worker from another thread while the shell waits on it
    let terminator = {
        let lifecycle = lifecycle.clone();
        thread::spawn(move || lifecycle.terminate(worker, 0))
    };
    let reaped = lifecycle
        .wait_coordinator()
        .wait(shell, WaitTarget::Child(worker))?;
    terminator.join().expect("terminator thread panicked")?;

    println!(
        "reaped PID {} with status {}",
        reaped.pid, reaped.exit_status
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&lifecycle.table().list())?
    );

    Ok(())
}
