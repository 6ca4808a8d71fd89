//! Scheduler ticks the resolver yields on while polling.

use std::thread;
use std::time::{Duration, Instant};

/// Default interval between two ticks, one frame at 60 Hz.
pub const DEFAULT_TICK: Duration = Duration::from_nanos(16_666_667);

/// Suspends the caller until the next scheduler tick.
pub trait Tick {
	/// Yields once and returns how long the caller was suspended.
	fn wait(&mut self) -> Duration;
}

impl<T: Tick + ?Sized> Tick for &mut T {
	fn wait(&mut self) -> Duration {
		(**self).wait()
	}
}

impl<T: Tick + ?Sized> Tick for Box<T> {
	fn wait(&mut self) -> Duration {
		(**self).wait()
	}
}

/// Which part of the program a resolution runs in. Picks the tick to yield on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionContext {
	/// Rendering side, resumes on frame boundaries.
	Presentation,
	/// Everything else, resumes on the generic scheduler.
	#[default]
	Simulation,
}

impl ExecutionContext {
	pub fn tick(self) -> Box<dyn Tick + Send> {
		match self {
			ExecutionContext::Presentation => Box::new(FrameTick::default()),
			ExecutionContext::Simulation => Box::new(YieldTick::default()),
		}
	}
}

/// Resumes on the next frame boundary, counted in whole frames from `epoch`.
#[derive(Debug, Clone)]
pub struct FrameTick {
	epoch: Instant,
	frame: Duration,
}

impl FrameTick {
	pub fn new(frame: Duration) -> Self {
		Self {
			epoch: Instant::now(),
			frame: frame.max(Duration::from_micros(1)),
		}
	}
}

impl Default for FrameTick {
	fn default() -> Self {
		Self::new(DEFAULT_TICK)
	}
}

impl Tick for FrameTick {
	fn wait(&mut self) -> Duration {
		let start = Instant::now();
		let frame = self.frame.as_nanos();
		let since_epoch = start.duration_since(self.epoch).as_nanos();
		let next_frame = (since_epoch / frame + 1) * frame;
		// never more than a single frame away, so this fits comfortably
		let remaining = Duration::from_nanos((next_frame - since_epoch) as u64);
		thread::sleep(remaining);
		start.elapsed()
	}
}

/// Sleeps a fixed interval per tick.
#[derive(Debug, Clone)]
pub struct YieldTick {
	interval: Duration,
}

impl YieldTick {
	pub fn new(interval: Duration) -> Self {
		Self { interval }
	}
}

impl Default for YieldTick {
	fn default() -> Self {
		Self::new(DEFAULT_TICK)
	}
}

impl Tick for YieldTick {
	fn wait(&mut self) -> Duration {
		let start = Instant::now();
		if self.interval.is_zero() {
			thread::yield_now();
		} else {
			thread::sleep(self.interval);
		}
		start.elapsed()
	}
}

/// Virtual clock advancing by `step` per tick without ever sleeping.
///
/// A hook can run on every tick, which lets simulations and tests change the scene while a resolution is polling.
pub struct FixedTick<'a> {
	step: Duration,
	ticks: u32,
	hook: Option<Box<dyn FnMut(u32) + 'a>>,
}

impl<'a> FixedTick<'a> {
	pub fn new(step: Duration) -> Self {
		Self {
			step,
			ticks: 0,
			hook: None,
		}
	}

	/// Calls `hook` with the tick number (starting at 1) each time the tick fires.
	pub fn on_tick<'b>(self, hook: impl FnMut(u32) + 'b) -> FixedTick<'b>
	where
		'a: 'b,
	{
		FixedTick {
			step: self.step,
			ticks: self.ticks,
			hook: Some(Box::new(hook)),
		}
	}

	/// Number of ticks waited so far.
	pub fn ticks(&self) -> u32 {
		self.ticks
	}

	/// Total virtual time waited so far.
	pub fn elapsed(&self) -> Duration {
		self.step * self.ticks
	}
}

impl Tick for FixedTick<'_> {
	fn wait(&mut self) -> Duration {
		self.ticks += 1;
		if let Some(hook) = self.hook.as_mut() {
			hook(self.ticks);
		}
		self.step
	}
}
