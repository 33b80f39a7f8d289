//! Test model shared by the unit tests of this crate.

use crate::delta::{Change, Delta};
use std::fmt;

/// A counter that records every applied adjustment.
#[derive(Debug, Default)]
pub struct Tally {
    pub value: i64,
    pub locked: bool,
    pub log: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Adjust {
    pub id: u32,
    pub amount: i64,
}

#[derive(Debug)]
pub struct TallyLocked;

impl fmt::Display for TallyLocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tally is locked")
    }
}

impl std::error::Error for TallyLocked {}

impl Delta for Adjust {
    type Model = Tally;
    type Error = TallyLocked;

    fn apply(&self, model: &mut Tally) -> Result<(), TallyLocked> {
        if model.locked {
            return Err(TallyLocked);
        }
        model.value += self.amount;
        model.log.push(self.id);
        Ok(())
    }
}

/// Builds a change whose forward delta adds `amount` and whose backward
/// delta subtracts it again.
pub fn adjust(id: u32, amount: i64) -> Change<Adjust> {
    Change::new(Adjust { id, amount }, Adjust { id, amount: -amount })
}
