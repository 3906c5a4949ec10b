use futures::executor::LocalPool;
use futures::future::ready;
use futures::stream::{self, Stream, StreamExt};
use futures::task::LocalSpawnExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Deterministically drives a stream to completion from synchronous test code.
///
/// Each call to `next()` runs the executor until it stalls and returns
/// whatever items accumulated since the previous call (possibly empty),
/// or `None` once the stream has terminated.
pub struct Drainer<T> {
    acc: Arc<Mutex<Vec<T>>>,
    done: Arc<AtomicBool>,
    pool: LocalPool,
}

impl<T: 'static> Drainer<T> {
    pub fn new<St: Stream<Item = T> + 'static>(stream: St) -> Drainer<T> {
        let acc2 = Arc::new(Mutex::new(Vec::<T>::new()));
        let done2 = Arc::new(AtomicBool::new(false));

        let acc = acc2.clone();
        let done = done2.clone();

        let pool = LocalPool::new();
        pool.spawner()
            .spawn_local(
                stream
                    .filter_map(move |x| {
                        acc2.lock().unwrap().push(x);
                        ready(None)
                    })
                    .chain(stream::iter(vec![()]).map(move |_| {
                        done2.store(true, Ordering::Release);
                    }))
                    .for_each(|_| ready(())),
            )
            .expect("cannot spawn stream");

        Drainer { acc, done, pool }
    }
}

impl<T: Clone> Iterator for Drainer<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pool.run_until_stalled();

        let mut acc_guard = self.acc.lock().unwrap();
        if !acc_guard.is_empty() {
            let ret = (*acc_guard).clone();
            acc_guard.clear();
            return Some(ret);
        }
        if self.done.load(Ordering::Acquire) {
            return None;
        }

        Some(Vec::new())
    }
}
