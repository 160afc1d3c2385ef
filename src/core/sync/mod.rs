/*!
 * Synchronization Primitives
 *
 * Keyed park/notify primitive used to suspend an execution context until
 * an event for its key fires.
 *
 * # Architecture
 *
 * `ParkQueue` is the suspension primitive underneath blocking wait-for-child:
 * callers snapshot an event generation, re-check their wait condition, and
 * park only while the generation is unchanged. A notify between the check
 * and the park bumps the generation, so the park returns immediately and
 * no wakeup is ever lost.
 */

mod park;

pub use park::{ParkQueue, WaitToken, WakeResult};
