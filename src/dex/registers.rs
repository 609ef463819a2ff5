use log::error;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Liveness = Rc<RefCell<Vec<bool>>>;

/// A local register held for the lifetime of the guard
///
/// Dropping the guard returns the register to its method's pool, so it can be handed out again by
/// the next allocation.
pub struct LiveRegister {
    liveness: Liveness,
    index: usize,
}

impl LiveRegister {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Debug for LiveRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.index)
    }
}

impl Drop for LiveRegister {
    fn drop(&mut self) {
        let mut liveness = self.liveness.borrow_mut();
        match liveness.get_mut(self.index) {
            Some(live) if *live => *live = false,
            _ => error!("register v{} released twice", self.index),
        }
    }
}

/// Liveness vector of a method's local registers; its length is the number of locals.
#[derive(Debug, Default)]
pub(crate) struct RegisterFile {
    liveness: Liveness,
}

impl RegisterFile {
    /// Reuses the lowest free register, growing the frame only when all are live.
    pub(crate) fn alloc(&self) -> LiveRegister {
        let mut liveness = self.liveness.borrow_mut();
        let index = match liveness.iter().position(|live| !live) {
            Some(free) => {
                liveness[free] = true;
                free
            }
            None => {
                liveness.push(true);
                liveness.len() - 1
            }
        };
        LiveRegister {
            liveness: Rc::clone(&self.liveness),
            index,
        }
    }

    pub(crate) fn num_registers(&self) -> usize {
        self.liveness.borrow().len()
    }
}
