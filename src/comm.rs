/*!
# Communication Abstraction

Generation itself is communication-free; the only collectives in the
system are (a) learning rank and size, (b) the validator's exchange of
reverse-edge queries, and (c) the rank-ordered output driver. All three go
through the [`Communicator`] trait so that the core never names a
transport.

Provided transports:
- [`NoComm`]: the single-rank case, a no-op.
- [`ThreadComm`]: an in-process transport simulating `P` ranks as `P`
  threads over a shared mailbox; used by the multi-rank tests.
- `MpiComm` (feature `mpi-support`): inter-process transport over MPI.

Everything is built on one primitive, the personalized all-to-all
exchange of `u64` buckets; `all_gather` and `barrier` derive from it.
Collectives must be called in the same order on every rank
(bulk-synchronous model).
*/

use std::cell::Cell;
use std::sync::{Arc, Condvar, Mutex};

use fxhash::FxHashMap;

use crate::edge::VertexRange;

/// Message-passing interface consumed by the validator and the output
/// driver.
pub trait Communicator {
    /// Rank of this process (`0..size`)
    fn rank(&self) -> usize;

    /// Total number of ranks
    fn size(&self) -> usize;

    /// Personalized all-to-all: `buckets[dst]` is delivered to rank `dst`.
    /// Returns the received buckets indexed by source rank.
    ///
    /// # Panics
    /// Panics if `buckets.len() != self.size()`.
    fn all_to_all_v(&self, buckets: Vec<Vec<u64>>) -> Vec<Vec<u64>>;

    /// Gathers one bucket from every rank, in rank order.
    fn all_gather(&self, item: Vec<u64>) -> Vec<Vec<u64>> {
        self.all_to_all_v(vec![item; self.size()])
    }

    /// Synchronization barrier.
    fn barrier(&self) {
        self.all_to_all_v(vec![Vec::new(); self.size()]);
    }

    /// Gathers a single value from every rank, in rank order.
    fn all_gather_u64(&self, value: u64) -> Vec<u64> {
        self.all_gather(vec![value])
            .into_iter()
            .map(|bucket| bucket[0])
            .collect()
    }

    /// Gathers the vertex range of every rank, in rank order.
    fn all_gather_ranges(&self, range: VertexRange) -> Vec<VertexRange> {
        self.all_gather(vec![range.first, range.first_invalid])
            .into_iter()
            .map(|bucket| VertexRange::new(bucket[0], bucket[1]))
            .collect()
    }
}

/// Compile-time no-op comm for single-rank runs and serial unit tests.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_to_all_v(&self, buckets: Vec<Vec<u64>>) -> Vec<Vec<u64>> {
        assert_eq!(buckets.len(), 1);
        buckets
    }

    fn barrier(&self) {}
}

// --- ThreadComm: intra-process / multi-thread ---

// (epoch, src, dst)
type SlotKey = (u64, usize, usize);

struct Mailbox {
    size: usize,
    slots: Mutex<FxHashMap<SlotKey, Vec<u64>>>,
    cv: Condvar,
}

/// In-process transport: one endpoint per simulated rank, sharing a
/// mailbox. Endpoints are handed out by [`ThreadComm::split`] and moved
/// into their rank's thread.
pub struct ThreadComm {
    rank: usize,
    epoch: Cell<u64>,
    mailbox: Arc<Mailbox>,
}

impl ThreadComm {
    /// Creates `size` connected endpoints, one per rank.
    pub fn split(size: usize) -> Vec<ThreadComm> {
        assert!(size > 0);

        let mailbox = Arc::new(Mailbox {
            size,
            slots: Mutex::new(FxHashMap::default()),
            cv: Condvar::new(),
        });

        (0..size)
            .map(|rank| ThreadComm {
                rank,
                epoch: Cell::new(0),
                mailbox: mailbox.clone(),
            })
            .collect()
    }

    /// Runs `f` once per rank on its own thread and returns the results in
    /// rank order.
    pub fn run<T, F>(size: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(ThreadComm) -> T + Sync,
    {
        let comms = Self::split(size);
        std::thread::scope(|scope| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| scope.spawn(|| f(comm)))
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join().expect("rank thread panicked"))
                .collect()
        })
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.mailbox.size
    }

    fn all_to_all_v(&self, buckets: Vec<Vec<u64>>) -> Vec<Vec<u64>> {
        let size = self.mailbox.size;
        assert_eq!(buckets.len(), size);

        let epoch = self.epoch.get();
        self.epoch.set(epoch + 1);

        let mut slots = self.mailbox.slots.lock().expect("mailbox poisoned");
        for (dst, bucket) in buckets.into_iter().enumerate() {
            slots.insert((epoch, self.rank, dst), bucket);
        }
        self.mailbox.cv.notify_all();

        loop {
            if (0..size).all(|src| slots.contains_key(&(epoch, src, self.rank))) {
                break;
            }
            slots = self.mailbox.cv.wait(slots).expect("mailbox poisoned");
        }

        (0..size)
            .map(|src| slots.remove(&(epoch, src, self.rank)).expect("slot vanished"))
            .collect()
    }
}

// --- MPI backend ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::collective::CommunicatorCollectives;
    use mpi::environment::Universe;
    use mpi::point_to_point::{Destination, Source};
    use mpi::topology::{Communicator as _, SimpleCommunicator};

    /// Inter-process transport over MPI.
    pub struct MpiComm {
        _universe: Universe,
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
    }

    impl Default for MpiComm {
        fn default() -> Self {
            let universe = mpi::initialize().expect("MPI initialization failed");
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Self {
                _universe: universe,
                world,
                rank,
                size,
            }
        }
    }

    impl Communicator for MpiComm {
        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn barrier(&self) {
            self.world.barrier();
        }

        fn all_to_all_v(&self, buckets: Vec<Vec<u64>>) -> Vec<Vec<u64>> {
            assert_eq!(buckets.len(), self.size);

            // Pairwise ordered exchange: the lower rank of each pair sends
            // first, so no cycle of blocking sends can form.
            let mut received: Vec<Vec<u64>> = (0..self.size).map(|_| Vec::new()).collect();
            received[self.rank] = buckets[self.rank].clone();

            for peer in 0..self.size {
                if peer == self.rank {
                    continue;
                }
                let process = self.world.process_at_rank(peer as i32);
                if self.rank < peer {
                    process.send(&buckets[peer][..]);
                    let (data, _status) = process.receive_vec::<u64>();
                    received[peer] = data;
                } else {
                    let (data, _status) = process.receive_vec::<u64>();
                    received[peer] = data;
                    process.send(&buckets[peer][..]);
                }
            }

            received
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_comm_is_identity() {
        let comm = NoComm;
        assert_eq!(comm.all_gather_u64(7), vec![7]);
        let out = comm.all_to_all_v(vec![vec![1, 2, 3]]);
        assert_eq!(out, vec![vec![1, 2, 3]]);
    }

    #[test]
    fn thread_comm_all_gather() {
        for size in [1usize, 2, 5] {
            let results = ThreadComm::run(size, |comm| comm.all_gather_u64(comm.rank() as u64));
            for gathered in results {
                assert_eq!(gathered, (0..size as u64).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn thread_comm_all_to_all() {
        let size = 4usize;
        let results = ThreadComm::run(size, |comm| {
            // Rank r sends [r, dst] to every dst.
            let buckets = (0..size)
                .map(|dst| vec![comm.rank() as u64, dst as u64])
                .collect();
            comm.all_to_all_v(buckets)
        });

        for (rank, received) in results.into_iter().enumerate() {
            for (src, bucket) in received.into_iter().enumerate() {
                assert_eq!(bucket, vec![src as u64, rank as u64]);
            }
        }
    }

    #[test]
    fn thread_comm_ranges() {
        let results = ThreadComm::run(3, |comm| {
            let range = VertexRange::balanced(10, comm.rank(), comm.size());
            comm.all_gather_ranges(range)
        });

        for ranges in results {
            assert_eq!(ranges[0], VertexRange::new(0, 4));
            assert_eq!(ranges[1], VertexRange::new(4, 7));
            assert_eq!(ranges[2], VertexRange::new(7, 10));
        }
    }

    #[test]
    fn repeated_collectives_stay_in_step() {
        let results = ThreadComm::run(3, |comm| {
            let mut sums = Vec::new();
            for round in 0..10u64 {
                let gathered = comm.all_gather_u64(round + comm.rank() as u64);
                sums.push(gathered.iter().sum::<u64>());
            }
            comm.barrier();
            sums
        });

        let expected: Vec<u64> = (0..10u64).map(|round| 3 * round + 3).collect();
        for sums in results {
            assert_eq!(sums, expected);
        }
    }
}
