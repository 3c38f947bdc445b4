//! Hooks around native calls that may block for an unbounded time.

/**
Lets a host runtime give up and reclaim its execution claim around a blocking OCI call.

`release` is called right before statement execution, bulk execution or a dequeue enters OCI,
and `reacquire` right after the call returns, before any result is looked at. Fast calls such as
binds, handle allocations and attribute access never invoke the hook.

# Example

```
use ocibind::BlockingHook;
use std::sync::atomic::{AtomicUsize, Ordering};

struct InFlight(AtomicUsize);

impl BlockingHook for InFlight {
    fn release(&self)   { self.0.fetch_add(1, Ordering::SeqCst); }
    fn reacquire(&self) { self.0.fetch_sub(1, Ordering::SeqCst); }
}
```
*/
pub trait BlockingHook : Send + Sync {
    fn release(&self);
    fn reacquire(&self);
}

/// Keeps the hook released while it is alive.
pub(crate) struct BlockingSection<'a> {
    hook: Option<&'a dyn BlockingHook>,
}

impl<'a> BlockingSection<'a> {
    pub(crate) fn enter(hook: Option<&'a dyn BlockingHook>) -> Self {
        log::trace!("entering blocking section");
        if let Some(hook) = hook {
            hook.release();
        }
        Self { hook }
    }
}

impl Drop for BlockingSection<'_> {
    fn drop(&mut self) {
        if let Some(hook) = self.hook {
            hook.reacquire();
        }
        log::trace!("left blocking section");
    }
}
