// src/shared_data.rs

use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Wall-clock time used for every assigned `createdAt`/`timestamp`.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Human readable timestamp used by the health check and status payloads.
pub fn display_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

// A panicked writer leaves plain data behind, so the lock is simply taken back.
pub fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn display_time_uses_plain_date_and_time() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(display_time(at), "2024-03-09 07:05:01");
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let data = std::sync::Arc::new(RwLock::new(1));
        let cloned = data.clone();
        let _ = std::thread::spawn(move || {
            let _guard = cloned.write().unwrap();
            panic!("poison");
        })
        .join();
        assert!(data.is_poisoned());
        *write_lock(&data) += 1;
        assert_eq!(*read_lock(&data), 2);
    }
}
