//! S6 — ordinal stability: adding or removing a method must not renumber
//! the ordinals of the methods that stay, and an explicit ordinal always
//! preempts the hash computation.
//!
//! `primemover_kernel::ordinal::assign_ordinal` is exercised directly by
//! its own unit tests; this file checks the same property survives actual
//! `#[entity]` expansion, since that's the only place the const fns this
//! test reads (`__pm_ordinal_*`) exist.

use primemover_macros::entity;

struct BeforeAddingD;

#[entity]
impl BeforeAddingD {
    #[event]
    fn a(&self) -> Result<(), std::convert::Infallible> {
        Ok(())
    }
    #[event]
    fn b(&self) -> Result<(), std::convert::Infallible> {
        Ok(())
    }
    #[event]
    fn c(&self) -> Result<(), std::convert::Infallible> {
        Ok(())
    }
}

struct AfterAddingD;

#[entity]
impl AfterAddingD {
    #[event]
    fn a(&self) -> Result<(), std::convert::Infallible> {
        Ok(())
    }
    #[event]
    fn b(&self) -> Result<(), std::convert::Infallible> {
        Ok(())
    }
    #[event]
    fn c(&self) -> Result<(), std::convert::Infallible> {
        Ok(())
    }
    #[event]
    fn d(&self) -> Result<(), std::convert::Infallible> {
        Ok(())
    }
}

struct AfterRemovingB;

#[entity]
impl AfterRemovingB {
    #[event]
    fn a(&self) -> Result<(), std::convert::Infallible> {
        Ok(())
    }
    #[event]
    fn c(&self) -> Result<(), std::convert::Infallible> {
        Ok(())
    }
}

struct WithExplicitOrdinalOnA;

#[entity]
impl WithExplicitOrdinalOnA {
    #[event(ordinal = 1000)]
    fn a(&self) -> Result<(), std::convert::Infallible> {
        Ok(())
    }
    #[event]
    fn b(&self) -> Result<(), std::convert::Infallible> {
        Ok(())
    }
}

#[test]
fn adding_a_method_does_not_renumber_existing_ones() {
    assert_eq!(BeforeAddingD::__pm_ordinal_a(), AfterAddingD::__pm_ordinal_a());
    assert_eq!(BeforeAddingD::__pm_ordinal_b(), AfterAddingD::__pm_ordinal_b());
    assert_eq!(BeforeAddingD::__pm_ordinal_c(), AfterAddingD::__pm_ordinal_c());
}

#[test]
fn removing_a_method_does_not_shift_the_others() {
    assert_eq!(BeforeAddingD::__pm_ordinal_a(), AfterRemovingB::__pm_ordinal_a());
    assert_eq!(BeforeAddingD::__pm_ordinal_c(), AfterRemovingB::__pm_ordinal_c());
}

#[test]
fn explicit_ordinal_preempts_the_hash_computation() {
    assert_eq!(WithExplicitOrdinalOnA::__pm_ordinal_a(), 1000);
}
