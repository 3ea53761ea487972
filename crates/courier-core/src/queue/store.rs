//! FIFO holding area for jobs that have not reached a terminal state.

use std::collections::VecDeque;

use crate::domain::Job;

/// Ordered store of pending jobs.
///
/// Producers append at the back, the drain loop pops from the front. Retried
/// jobs are appended again, so they are served after everything already
/// waiting.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: VecDeque<Job>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, job: Job) {
        self.jobs.push_back(job);
    }

    pub fn pop_front(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::RetryPolicy;
    use serde_json::json;

    fn job(n: u32) -> Job {
        Job::new("t", json!(n), RetryPolicy::default())
    }

    #[test]
    fn pops_in_append_order() {
        let mut store = JobStore::new();
        for n in 0..3 {
            store.append(job(n));
        }
        assert_eq!(store.len(), 3);

        let order: Vec<_> = std::iter::from_fn(|| store.pop_front())
            .map(|j| j.payload)
            .collect();
        assert_eq!(order, vec![json!(0), json!(1), json!(2)]);
        assert!(store.is_empty());
    }

    #[test]
    fn pop_on_empty_returns_none() {
        let mut store = JobStore::new();
        assert!(store.pop_front().is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn reappended_job_goes_behind_waiting_jobs() {
        let mut store = JobStore::new();
        store.append(job(0));
        store.append(job(1));

        let first = store.pop_front().unwrap();
        store.append(first);

        assert_eq!(store.pop_front().unwrap().payload, json!(1));
        assert_eq!(store.pop_front().unwrap().payload, json!(0));
    }
}
