//! The coroutine handle

use super::control::Control;
use super::state::{CoroutineState, ExitReason, Landing};
use super::Schedulable;
use crate::arch::{ContextSwitch, Native};
use crate::config::DEFAULT_STACK_SIZE;
use crate::fault::{self, Fault};
use crate::scheduler;
use crate::stack::StackRegion;

/// Body of a coroutine
///
/// Receives its own handle (for `yield_now`, `stop`, ...) and the argument
/// given at construction. Returning `Err` ends the coroutine as `Faulted`.
pub type EntryPoint<A, const N: usize> = fn(&Coroutine<A, N>, &A) -> Result<(), Fault>;

/// A cooperatively scheduled routine with a private `N`-byte stack
///
/// Coroutines are usually placed in a `static` or a `StaticCell`: the
/// scheduler keeps a `'static` reference from `start()` on and the stack
/// must never move while the coroutine is registered.
///
/// With the `std` feature every thread has its own scheduler, and a
/// coroutine is not `Sync`: it stays with the thread that created it.
pub struct Coroutine<A, const N: usize = DEFAULT_STACK_SIZE> {
    name: &'static str,
    entry: EntryPoint<A, N>,
    argument: A,
    control: Control,
    stack: StackRegion<N>,
}

// SAFETY: bare-metal builds have one scheduler on one core, and it only
// touches a coroutine between explicit yield points.
#[cfg(not(any(test, feature = "std")))]
unsafe impl<A: Sync, const N: usize> Sync for Coroutine<A, N> {}

impl<A, const N: usize> Coroutine<A, N> {
    pub const fn new(name: &'static str, entry: EntryPoint<A, N>, argument: A) -> Self {
        Self {
            name,
            entry,
            argument,
            control: Control::new(),
            stack: StackRegion::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn argument(&self) -> &A {
        &self.argument
    }

    pub fn stack(&self) -> &StackRegion<N> {
        &self.stack
    }

    /// Mutable stack access, e.g. to paint it before the first start
    pub fn stack_mut(&mut self) -> &mut StackRegion<N> {
        &mut self.stack
    }

    /// Deregister from the scheduler
    ///
    /// Code already running inside the coroutine is not interrupted: it
    /// continues to its next yield or return and is never resumed after
    /// that. A later `start()` runs the entry point from the beginning.
    pub fn stop(&self) {
        let was_active = self.control.is_active();
        self.control.deactivate();
        scheduler::deregister(&self.control);
        if was_active {
            info!("{} stopped", self.name);
        }
    }

    /// Keep the registration but skip the coroutine on every pass
    pub fn pause(&self) {
        if self.control.is_active() {
            self.control.set_paused(true);
            trace!("{} paused", self.name);
        }
    }

    pub fn resume(&self) {
        if self.control.is_active() {
            self.control.set_paused(false);
            trace!("{} resumed", self.name);
        }
    }

    pub fn toggle_pause(&self) {
        if self.control.is_paused() {
            self.resume();
        } else {
            self.pause();
        }
    }

    pub fn is_active(&self) -> bool {
        self.control.is_active()
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// Wait until this coroutine is no longer registered
    ///
    /// Inside a coroutine the caller yields while it waits. From the root
    /// context the scheduler is driven pass by pass instead. Joining a
    /// paused coroutine, or the caller itself, never returns.
    pub fn join(&self) {
        while self.control.is_active() {
            scheduler::wait_turn();
        }
    }

    /// Yield the running coroutine back to the scheduler
    pub fn yield_now(&self) {
        scheduler::yield_now();
    }

    pub fn state(&self) -> CoroutineState {
        self.control.state()
    }

    pub fn exit_reason(&self) -> ExitReason {
        self.control.exit_reason()
    }

    /// Fault that ended the last run, if it faulted
    pub fn fault(&self) -> Option<Fault> {
        self.control.fault()
    }

    /// Number of turns the scheduler has given this coroutine (wraps)
    pub fn resumptions(&self) -> u32 {
        self.control.resumptions()
    }
}

impl<A: 'static, const N: usize> Coroutine<A, N> {
    /// Register with the scheduler
    ///
    /// Does nothing if the coroutine is already active or paused. Fails
    /// with a capacity fault when the registry is full.
    pub fn start(&'static self) -> Result<(), Fault> {
        if self.control.is_active() {
            return Ok(());
        }
        scheduler::register(self)?;
        self.control.activate();
        info!("{} started", self.name);
        Ok(())
    }
}

impl<A, const N: usize> Drop for Coroutine<A, N> {
    fn drop(&mut self) {
        if self.control.is_active() {
            self.stop();
        }
    }
}

impl<A: 'static, const N: usize> Schedulable for Coroutine<A, N> {
    fn control(&self) -> &Control {
        &self.control
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn run_or_resume(&'static self) {
        let control = &self.control;
        if !control.is_runnable() {
            return;
        }

        let runtime = scheduler::runtime();
        runtime.current.set(Some(self));
        if control.begin_turn() {
            trace!("{} activated", self.name);
            let sp = Native::initial_stack_pointer(self.stack.start(), self.stack.end());
            let arg = (self as *const Self).cast_mut().cast::<()>();
            // SAFETY: the stack belongs to this coroutine alone and is pinned
            // by the `'static` borrow. `launch` never returns; it comes back
            // here by switching to the yield checkpoint saved by the hop.
            unsafe { Native::hop_to_stack(control.yield_point(), sp, launch::<A, N>, arg) };
        } else {
            // SAFETY: `was_called` is set, so the resume checkpoint was saved
            // by the coroutine's last suspend on its still intact stack.
            unsafe { Native::switch(control.yield_point(), control.resume_point()) };
        }
        runtime.current.set(None);

        match control.landing() {
            Landing::Yielded => trace!("{} yielded", self.name),
            Landing::Returned => {
                control.record_exit(ExitReason::Returned);
                info!("{} returned", self.name);
                self.stop();
            }
            Landing::Faulted => {
                control.record_exit(ExitReason::Faulted);
                if let Some(fault) = control.fault() {
                    warn!("{} faulted: {}", self.name, fault);
                }
                self.stop();
            }
        }
    }
}

/// First frame on a coroutine stack
unsafe extern "C" fn launch<A: 'static, const N: usize>(arg: *mut ()) -> ! {
    // SAFETY: `run_or_resume` hands over a pointer to a `'static` coroutine.
    let coroutine = unsafe { &*arg.cast_const().cast::<Coroutine<A, N>>() };
    let outcome = fault::boundary(|| (coroutine.entry)(coroutine, &coroutine.argument));
    coroutine.control.finish(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::FaultKind;
    use crate::scheduler::{active_count, reset, run_pass, run_passes, yield_now};
    use core::cell::{Cell, RefCell};
    use crate::lock::Lock;
    use proptest::prelude::*;
    use std::boxed::Box;
    use std::vec::Vec;

    const STACK: usize = 16 * 1024;

    fn leak<A: 'static, const N: usize>(
        name: &'static str,
        entry: EntryPoint<A, N>,
        argument: A,
    ) -> &'static Coroutine<A, N> {
        Box::leak(Box::new(Coroutine::new(name, entry, argument)))
    }

    fn yield_once(me: &Coroutine<Cell<u32>, STACK>, step: &Cell<u32>) -> Result<(), Fault> {
        step.set(1);
        me.yield_now();
        step.set(2);
        Ok(())
    }

    fn spin(_: &Coroutine<Cell<u32>, STACK>, turns: &Cell<u32>) -> Result<(), Fault> {
        loop {
            turns.set(turns.get() + 1);
            yield_now();
        }
    }

    #[test]
    fn test_returning_coroutine_leaves_registry() {
        reset();
        let a = leak("a", yield_once, Cell::new(0));
        let b = leak("b", spin, Cell::new(0));
        a.start().unwrap();
        b.start().unwrap();
        assert_eq!(active_count(), 2);

        run_passes(3);

        assert_eq!(a.argument().get(), 2);
        assert_eq!(a.state(), CoroutineState::Returned);
        assert_eq!(a.exit_reason(), ExitReason::Returned);
        assert!(b.is_active());
        assert_eq!(b.argument().get(), 3);
        assert_eq!(active_count(), 1);
    }

    #[test]
    fn test_start_then_stop_is_net_zero() {
        reset();
        let a = leak("a", spin, Cell::new(0));
        assert_eq!(a.state(), CoroutineState::NotStarted);
        a.start().unwrap();
        a.stop();
        assert_eq!(active_count(), 0);
        assert_eq!(a.state(), CoroutineState::Stopped);

        run_passes(2);
        assert_eq!(a.argument().get(), 0);
    }

    struct Spawner {
        child: &'static Coroutine<Cell<u32>, STACK>,
    }

    fn start_and_stop_child(_: &Coroutine<Spawner, STACK>, arg: &Spawner) -> Result<(), Fault> {
        loop {
            arg.child.start()?;
            arg.child.stop();
            yield_now();
        }
    }

    #[test]
    fn test_start_then_stop_inside_pass_is_net_zero() {
        reset();
        let child = leak("child", spin, Cell::new(0));
        let parent = leak("parent", start_and_stop_child, Spawner { child });
        parent.start().unwrap();

        run_passes(5);

        assert_eq!(active_count(), 1);
        assert_eq!(child.argument().get(), 0);
        assert_eq!(child.state(), CoroutineState::Stopped);
    }

    fn fail_after_yield(_: &Coroutine<Cell<u32>, STACK>, step: &Cell<u32>) -> Result<(), Fault> {
        step.set(1);
        yield_now();
        Err(Fault::low_level("adc overrun"))
    }

    #[test]
    fn test_fault_is_contained() {
        reset();
        let bad = leak("bad", fail_after_yield, Cell::new(0));
        let good = leak("good", spin, Cell::new(0));
        bad.start().unwrap();
        good.start().unwrap();

        run_passes(4);

        assert_eq!(bad.state(), CoroutineState::Faulted);
        assert_eq!(bad.fault(), Some(Fault::low_level("adc overrun")));
        assert!(!bad.is_active());
        assert_eq!(good.argument().get(), 4);
    }

    fn panics(_: &Coroutine<(), { 64 * 1024 }>, _: &()) -> Result<(), Fault> {
        panic!("coroutine body panicked");
    }

    #[test]
    fn test_panic_becomes_fault() {
        reset();
        let co = leak("panics", panics, ());
        co.start().unwrap();
        run_pass();
        assert_eq!(co.state(), CoroutineState::Faulted);
        assert_eq!(co.fault().map(|f| f.kind()), Some(FaultKind::Panic));
    }

    fn yield_three(_: &Coroutine<Cell<u32>, STACK>, turns: &Cell<u32>) -> Result<(), Fault> {
        for _ in 0..3 {
            turns.set(turns.get() + 1);
            yield_now();
        }
        Ok(())
    }

    #[test]
    fn test_join_from_root_drives_scheduler() {
        reset();
        let co = leak("worker", yield_three, Cell::new(0));
        co.start().unwrap();
        co.join();
        assert_eq!(co.argument().get(), 3);
        assert_eq!(co.state(), CoroutineState::Returned);
    }

    struct Waiter {
        target: &'static Coroutine<Cell<u32>, STACK>,
        joined: Cell<bool>,
    }

    fn wait_for_target(_: &Coroutine<Waiter, STACK>, waiter: &Waiter) -> Result<(), Fault> {
        waiter.target.join();
        waiter.joined.set(true);
        Ok(())
    }

    #[test]
    fn test_join_returns_only_after_exit() {
        reset();
        let target = leak("target", yield_three, Cell::new(0));
        let waiter = leak(
            "waiter",
            wait_for_target,
            Waiter {
                target,
                joined: Cell::new(false),
            },
        );
        waiter.start().unwrap();
        target.start().unwrap();

        for _ in 0..10 {
            run_pass();
            if waiter.argument().joined.get() {
                assert!(target.state().has_exited());
            }
        }
        assert!(waiter.argument().joined.get());
        assert_eq!(waiter.state(), CoroutineState::Returned);
    }

    #[test]
    fn test_pause_skips_turns() {
        reset();
        let co = leak("paused", spin, Cell::new(0));
        co.start().unwrap();
        run_pass();
        assert_eq!(co.argument().get(), 1);

        co.pause();
        assert_eq!(co.state(), CoroutineState::Paused);
        run_passes(3);
        assert_eq!(co.argument().get(), 1);
        assert_eq!(active_count(), 1);

        co.toggle_pause();
        assert_eq!(co.state(), CoroutineState::Active);
        run_pass();
        assert_eq!(co.argument().get(), 2);
    }

    #[test]
    fn test_pause_before_start_is_ignored() {
        reset();
        let co = leak("idle", spin, Cell::new(0));
        co.pause();
        assert!(!co.is_paused());
        co.start().unwrap();
        run_pass();
        assert_eq!(co.argument().get(), 1);
    }

    struct Restartable {
        entries: Cell<u32>,
        turns: Cell<u32>,
    }

    fn count_entries(_: &Coroutine<Restartable, STACK>, arg: &Restartable) -> Result<(), Fault> {
        arg.entries.set(arg.entries.get() + 1);
        arg.turns.set(0);
        loop {
            arg.turns.set(arg.turns.get() + 1);
            yield_now();
        }
    }

    #[test]
    fn test_restart_runs_from_entry_point() {
        reset();
        let co = leak(
            "restart",
            count_entries,
            Restartable {
                entries: Cell::new(0),
                turns: Cell::new(0),
            },
        );
        co.start().unwrap();
        run_passes(3);
        assert_eq!(co.argument().turns.get(), 3);

        co.stop();
        co.start().unwrap();
        run_pass();
        assert_eq!(co.argument().entries.get(), 2);
        assert_eq!(co.argument().turns.get(), 1);
    }

    #[test]
    fn test_start_is_noop_when_active() {
        reset();
        let co = leak("once", spin, Cell::new(0));
        co.start().unwrap();
        co.start().unwrap();
        assert_eq!(active_count(), 1);
        run_pass();
        assert_eq!(co.argument().get(), 1);
    }

    fn record_sp(_: &Coroutine<Cell<usize>, STACK>, sp: &Cell<usize>) -> Result<(), Fault> {
        loop {
            sp.set(Native::current_stack_pointer() as usize);
            yield_now();
        }
    }

    #[test]
    fn test_each_coroutine_runs_on_its_own_stack() {
        reset();
        let a = leak("a", record_sp, Cell::new(0));
        let b = leak("b", record_sp, Cell::new(0));
        a.start().unwrap();
        b.start().unwrap();

        run_passes(2);

        let sp_a = a.argument().get() as *const u8;
        let sp_b = b.argument().get() as *const u8;
        assert!(a.stack().contains(sp_a));
        assert!(b.stack().contains(sp_b));
        assert!(!a.stack().contains(sp_b));
        assert!(!b.stack().contains(sp_a));
    }

    /// Copy of a region whose owner is not running
    fn stack_bytes<const N: usize>(stack: &StackRegion<N>) -> Vec<u8> {
        // SAFETY: the region is `N` bytes long and its owner is paused or
        // never started, so nothing writes it during the copy.
        unsafe { core::slice::from_raw_parts(stack.start().cast_const(), N) }.to_vec()
    }

    #[test]
    fn test_running_coroutine_leaves_other_stacks_intact() {
        reset();
        let mut parked = Box::new(Coroutine::new("parked", spin, Cell::new(0)));
        parked.stack_mut().fill(0x55);
        let parked: &'static Coroutine<Cell<u32>, STACK> = Box::leak(parked);
        let mut idle = Box::new(Coroutine::new("idle", spin, Cell::new(0)));
        idle.stack_mut().fill(0xAA);
        let idle: &'static Coroutine<Cell<u32>, STACK> = Box::leak(idle);

        // `parked` keeps a live frame, `idle` never gets a turn
        parked.start().unwrap();
        run_pass();
        parked.pause();
        idle.start().unwrap();
        idle.pause();
        let snapshot = stack_bytes(parked.stack());
        assert!(parked.stack().untouched(0x55) < STACK);

        let busy = leak("busy", spin, Cell::new(0));
        busy.start().unwrap();
        run_passes(1_000);

        assert_eq!(busy.argument().get(), 1_000);
        assert_eq!(idle.stack().untouched(0xAA), STACK);
        assert_eq!(stack_bytes(parked.stack()), snapshot);

        parked.resume();
        run_pass();
        assert_eq!(parked.argument().get(), 2);
    }

    fn toggle(_: &Coroutine<Cell<bool>, 8192>, flag: &Cell<bool>) -> Result<(), Fault> {
        loop {
            flag.set(!flag.get());
            yield_now();
        }
    }

    #[test]
    fn test_long_run_keeps_stack_usage_stable() {
        const GUARD: u8 = 0x5A;
        let painted = |co: &Coroutine<Cell<bool>, 8192>| {
            stack_bytes(co.stack())[1..]
                .iter()
                .take_while(|byte| **byte == 0xAA)
                .count()
        };

        reset();
        let mut boxed = Box::new(Coroutine::new("toggle", toggle, Cell::new(false)));
        boxed.stack_mut().fill(0xAA);
        boxed.stack_mut().set_guard(GUARD);
        let co: &'static Coroutine<Cell<bool>, 8192> = Box::leak(boxed);
        co.start().unwrap();

        run_passes(100);
        let early = painted(co);
        run_passes(9_900);

        assert!(!co.argument().get());
        assert_eq!(co.resumptions(), 10_000);
        assert!(early > 0);
        assert_eq!(painted(co), early);
        assert!(co.stack().guard_intact(GUARD));
    }

    fn nested_pass(_: &Coroutine<Cell<u32>, STACK>, ran: &Cell<u32>) -> Result<(), Fault> {
        if !run_pass() {
            ran.set(1);
        }
        Ok(())
    }

    #[test]
    fn test_nested_pass_is_ignored() {
        reset();
        let co = leak("nested", nested_pass, Cell::new(0));
        co.start().unwrap();
        run_pass();
        assert_eq!(co.argument().get(), 1);
        assert_eq!(crate::scheduler::passes(), 1);
    }

    fn report_name(_: &Coroutine<Cell<bool>, STACK>, seen: &Cell<bool>) -> Result<(), Fault> {
        seen.set(crate::scheduler::current_name() == Some("named"));
        Ok(())
    }

    #[test]
    fn test_current_name_inside_coroutine() {
        reset();
        let co = leak("named", report_name, Cell::new(false));
        co.start().unwrap();
        run_pass();
        assert!(co.argument().get());
        assert_eq!(crate::scheduler::current_name(), None);
    }

    #[test]
    fn test_registry_capacity() {
        reset();
        for _ in 0..crate::config::MAX_COROUTINES {
            leak("filler", spin, Cell::new(0)).start().unwrap();
        }
        let extra = leak("extra", spin, Cell::new(0));
        let fault = extra.start().unwrap_err();
        assert_eq!(fault.kind(), FaultKind::Capacity);
        assert_eq!(extra.state(), CoroutineState::NotStarted);
    }

    fn return_at_once(_: &Coroutine<Cell<u32>, STACK>, _: &Cell<u32>) -> Result<(), Fault> {
        Ok(())
    }

    struct Latecomer {
        fresh: &'static Coroutine<Cell<u32>, STACK>,
        started: Cell<Option<bool>>,
    }

    fn start_fresh(_: &Coroutine<Latecomer, STACK>, arg: &Latecomer) -> Result<(), Fault> {
        arg.started.set(Some(arg.fresh.start().is_ok()));
        loop {
            yield_now();
        }
    }

    #[test]
    fn test_start_after_exit_in_same_pass_fits_full_registry() {
        reset();
        let returner = leak("returner", return_at_once, Cell::new(0));
        returner.start().unwrap();
        for _ in 1..crate::config::MAX_COROUTINES - 1 {
            leak("filler", spin, Cell::new(0)).start().unwrap();
        }
        let fresh = leak("fresh", spin, Cell::new(0));
        let starter = leak(
            "starter",
            start_fresh,
            Latecomer {
                fresh,
                started: Cell::new(None),
            },
        );
        starter.start().unwrap();
        assert_eq!(active_count(), crate::config::MAX_COROUTINES);

        run_pass();
        assert_eq!(starter.argument().started.get(), Some(true));
        assert_eq!(returner.state(), CoroutineState::Returned);
        assert_eq!(fresh.argument().get(), 0);
        assert_eq!(active_count(), crate::config::MAX_COROUTINES);

        run_pass();
        assert_eq!(fresh.argument().get(), 1);
    }

    trait AmbiguousIfSync<M> {
        fn check() {}
    }
    impl<T: ?Sized> AmbiguousIfSync<()> for T {}
    struct IsSync;
    impl<T: ?Sized + Sync> AmbiguousIfSync<IsSync> for T {}

    #[test]
    fn test_host_handles_are_thread_bound() {
        // Only resolves while neither type is `Sync`
        <Coroutine<u32, 64> as AmbiguousIfSync<_>>::check();
        <Lock as AmbiguousIfSync<_>>::check();
    }

    struct Sequence {
        yields: u32,
        log: RefCell<Vec<u32>>,
    }

    fn log_each_yield(_: &Coroutine<Sequence, STACK>, seq: &Sequence) -> Result<(), Fault> {
        for point in 0..seq.yields {
            seq.log.borrow_mut().push(point);
            yield_now();
        }
        seq.log.borrow_mut().push(seq.yields);
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_yields_resume_in_order(yields in 0u32..40) {
            reset();
            let co = leak(
                "sequence",
                log_each_yield,
                Sequence { yields, log: RefCell::new(Vec::new()) },
            );
            co.start().unwrap();

            for pass in 0..=yields {
                run_pass();
                let expected: Vec<u32> = (0..=pass).collect();
                prop_assert_eq!(&*co.argument().log.borrow(), &expected);
            }
            prop_assert_eq!(co.state(), CoroutineState::Returned);
        }
    }
}
