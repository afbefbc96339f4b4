//! Trace-driven testing.
//!
//! Generates deterministic random operation traces, replays them against a
//! heap, and checks every heap invariant plus payload contents after each
//! step.

use btalloc::{Heap, HeapError, MemArena, Ptr};
use test_log::test;

const SLOTS: usize = 128;
const MAX_SIZE: usize = 2048;

#[derive(Debug, Clone, Copy)]
enum Op {
  Allocate(usize, usize),       // slot, size
  Release(usize),               // slot
  Resize(usize, usize),         // slot, new size
  ZeroAllocate(usize, usize, usize), // slot, count, size
}

/// Simple seeded PRNG
struct Rng(u64);

impl Rng {
  fn new(seed: u64) -> Self {
    Rng(seed)
  }

  fn next(&mut self) -> u64 {
    self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    self.0 >> 33
  }

  fn next_usize(
    &mut self,
    max: usize,
  ) -> usize {
    (self.next() as usize) % max
  }
}

fn generate_trace(
  seed: u64,
  count: usize,
) -> Vec<Op> {
  let mut rng = Rng::new(seed);
  (0..count)
    .map(|_| {
      let slot = rng.next_usize(SLOTS);
      match rng.next_usize(10) {
        0..=3 => Op::Allocate(slot, rng.next_usize(MAX_SIZE)),
        4..=6 => Op::Release(slot),
        7..=8 => Op::Resize(slot, rng.next_usize(MAX_SIZE)),
        _ => Op::ZeroAllocate(slot, rng.next_usize(16), rng.next_usize(64)),
      }
    })
    .collect()
}

#[derive(Clone, Copy)]
struct Live {
  ptr: Ptr,
  len: usize,
  seed: u8,
}

fn stamp(
  heap: &mut Heap<MemArena>,
  live: Live,
) {
  let payload = heap.payload_mut(live.ptr).unwrap();
  for (i, byte) in payload[..live.len].iter_mut().enumerate() {
    *byte = live.seed ^ (i as u8);
  }
}

fn verify(
  heap: &Heap<MemArena>,
  live: Live,
  len: usize,
) {
  let payload = heap.payload(live.ptr).unwrap();
  for (i, &byte) in payload[..len].iter().enumerate() {
    assert_eq!(byte, live.seed ^ (i as u8), "byte {} of {}", i, live.ptr);
  }
}

fn replay(
  seed: u64,
  ops: &[Op],
  capacity: usize,
) {
  let mut heap = Heap::new(MemArena::with_capacity(capacity)).unwrap();
  let mut slots: Vec<Option<Live>> = vec![None; SLOTS];
  let mut exhausted = 0;

  for (step, &op) in ops.iter().enumerate() {
    let tag = (seed as u8).wrapping_add(step as u8);

    match op {
      Op::Allocate(slot, size) => {
        if let Some(old) = slots[slot].take() {
          verify(&heap, old, old.len);
          heap.release(Some(old.ptr)).unwrap();
        }
        match heap.allocate(size) {
          Ok(Some(ptr)) => {
            let live = Live { ptr, len: size, seed: tag };
            stamp(&mut heap, live);
            slots[slot] = Some(live);
          }
          Ok(None) => assert_eq!(size, 0),
          Err(HeapError::OutOfMemory(_)) => exhausted += 1,
          Err(err) => panic!("step {step}: {err}"),
        }
      }
      Op::Release(slot) => {
        let old = slots[slot].take();
        if let Some(old) = old {
          verify(&heap, old, old.len);
        }
        heap.release(old.map(|live| live.ptr)).unwrap();
      }
      Op::Resize(slot, size) => {
        let old = slots[slot];
        match heap.resize(old.map(|live| live.ptr), size) {
          Ok(Some(ptr)) => {
            let kept = old.map_or(0, |live| live.len.min(size));
            if let Some(old) = old {
              verify(&heap, Live { ptr, ..old }, kept);
            }
            let live = Live { ptr, len: size, seed: tag };
            stamp(&mut heap, live);
            slots[slot] = Some(live);
          }
          Ok(None) => {
            assert_eq!(size, 0);
            slots[slot] = None;
          }
          Err(HeapError::OutOfMemory(_)) => {
            exhausted += 1;
            if let Some(old) = old {
              verify(&heap, old, old.len);
            }
          }
          Err(err) => panic!("step {step}: {err}"),
        }
      }
      Op::ZeroAllocate(slot, count, size) => {
        if let Some(old) = slots[slot].take() {
          heap.release(Some(old.ptr)).unwrap();
        }
        match heap.zero_allocate(count, size) {
          Ok(Some(ptr)) => {
            let len = count * size;
            assert!(heap.payload(ptr).unwrap()[..len].iter().all(|&b| b == 0));
            let live = Live { ptr, len, seed: tag };
            stamp(&mut heap, live);
            slots[slot] = Some(live);
          }
          Ok(None) => assert_eq!(count * size, 0),
          Err(HeapError::OutOfMemory(_)) => exhausted += 1,
          Err(err) => panic!("step {step}: {err}"),
        }
      }
    }

    if let Err(err) = heap.check() {
      panic!("seed {seed} step {step} ({op:?}): {err}");
    }
  }

  for live in slots.into_iter().flatten() {
    verify(&heap, live, live.len);
    heap.release(Some(live.ptr)).unwrap();
  }
  heap.check().unwrap();

  let stats = heap.stats();
  assert_eq!(stats.allocated_blocks, 0);
  assert_eq!(stats.free_blocks, 1);
  log::info!("seed {seed}: {} ops, {exhausted} exhausted, {} byte arena", ops.len(), stats.arena_bytes);
}

#[test]
fn replay_roomy_arena() {
  for seed in 0..8 {
    replay(seed, &generate_trace(seed, 2000), 1 << 20);
  }
}

#[test]
fn replay_tight_arena() {
  // Small enough that some operations hit exhaustion.
  for seed in 100..104 {
    replay(seed, &generate_trace(seed, 2000), 32 * 1024);
  }
}
