//! The plugin's datarefs and the checks run against them.

use anyhow::{ensure, Context, Result};
use datarefw::{CreateDataref, DataAccess, FindDataref};
use tracing::{debug, info};

/// Published writable int.
pub const INT_DATAREF: &str = "testing/test_int_dr";
/// Published read-only int array.
pub const INT_ARRAY_DATAREF: &str = "testing/test_int_array_dr";
/// Published writable string.
pub const STRING_DATAREF: &str = "testing/test_string_dr";

/// Number of elements in the published int array.
pub const INT_ARRAY_LEN: usize = 25;

const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

/// Everything the plugin publishes and looks up.
///
/// Fields drop in declaration order, so the lookups go before the datarefs
/// they point at.
pub struct DatarefDatabase<H: DataAccess> {
    find_int: FindDataref<i32, H>,
    find_string: FindDataref<String, H>,
    int_dataref: CreateDataref<i32, H>,
    int_array: CreateDataref<Vec<i32>, H>,
    string_dataref: CreateDataref<String, H>,
}

impl<H: DataAccess + Clone> DatarefDatabase<H> {
    /// Publish the test datarefs and bind the lookups.
    pub fn new(host: H) -> Result<Self> {
        let int_dataref: CreateDataref<i32, H> =
            CreateDataref::try_with_host(host.clone(), INT_DATAREF, true)
                .context("publishing int dataref")?;

        let mut int_array: CreateDataref<Vec<i32>, H> =
            CreateDataref::unregistered_array(host.clone(), INT_ARRAY_LEN);
        int_array
            .try_create_dataref(INT_ARRAY_DATAREF, false)
            .context("publishing int array dataref")?;

        let mut string_dataref: CreateDataref<String, H> =
            CreateDataref::unregistered(host.clone());
        string_dataref
            .try_create_dataref(STRING_DATAREF, true)
            .context("publishing string dataref")?;

        let mut find_int: FindDataref<i32, H> = FindDataref::unresolved(host.clone());
        find_int
            .try_find_dataref(INT_DATAREF)
            .context("looking up int dataref")?;

        let mut find_string: FindDataref<String, H> = FindDataref::unresolved(host);
        find_string
            .try_find_dataref(STRING_DATAREF)
            .context("looking up string dataref")?;

        debug!("dataref database ready");
        Ok(Self {
            find_int,
            find_string,
            int_dataref,
            int_array,
            string_dataref,
        })
    }

    /// Exercise every handle once, failing on the first unexpected value.
    pub fn exercise(&mut self) -> Result<()> {
        self.string_dataref.set_str(ALPHABET);
        ensure!(self.string_dataref == ALPHABET, "string dataref did not take its value");

        if self.find_string.found() {
            ensure!(
                self.find_string == ALPHABET,
                "lookup read '{}' instead of the published string",
                self.find_string.get()
            );
        }

        let (a, b, c) = (1, 2, 3);
        if self.find_int.found() && self.find_int.writable() {
            let find = &mut self.find_int;
            find.set(0);

            find.increment();
            ensure!(*find == 1, "increment gave {}", find.get());
            find.decrement();
            ensure!(*find == 0, "decrement gave {}", find.get());

            *find += 99 + a + (b - c);
            ensure!(*find == 99, "+= gave {}", find.get());
            *find *= 7 + a;
            ensure!(*find == 792, "*= gave {}", find.get());
            *find /= (4 + b) - c;
            ensure!(*find == 264, "/= gave {}", find.get());
            *find -= 73 - c;
            ensure!(*find == 194, "-= gave {}", find.get());
        }

        let mut text = self.string_dataref.get();
        if text.contains('b') {
            text.push_str("123456789");
            self.string_dataref.set(text);
        }

        for i in 0..self.int_array.size() {
            self.int_array.set_at(i, i as i32);
        }

        let text = self.string_dataref.get();
        info!(
            int = self.int_dataref.get(),
            string = text.as_str(),
            "dataref checks passed"
        );
        Ok(())
    }

    /// Current value of the published int.
    pub fn int_value(&self) -> i32 {
        self.int_dataref.get()
    }

    /// Current contents of the published int array.
    pub fn int_array(&self) -> Vec<i32> {
        self.int_array.get()
    }

    /// Current value of the published string.
    pub fn string_value(&self) -> String {
        self.string_dataref.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datarefw::{GuardedHost, MockHost};

    #[test]
    fn test_exercise_on_mock_host() {
        let host = MockHost::new();
        let mut database = DatarefDatabase::new(host.clone()).unwrap();
        assert_eq!(host.accessor_count(), 3);

        database.exercise().unwrap();
        assert_eq!(database.int_value(), 194);
        assert_eq!(
            database.string_value(),
            "abcdefghijklmnopqrstuvwxyz123456789"
        );
        assert_eq!(
            database.int_array(),
            (0..INT_ARRAY_LEN as i32).collect::<Vec<_>>()
        );

        let lookup: FindDataref<Vec<i32>, _> = FindDataref::with_host(host, INT_ARRAY_DATAREF);
        assert!(!lookup.writable());
        assert_eq!(lookup.get_index_value(24), 24);
    }

    #[test]
    fn test_exercise_through_thread_guard() {
        let host = MockHost::new();
        let mut database = DatarefDatabase::new(GuardedHost::new(host.clone())).unwrap();
        database.exercise().unwrap();
        assert_eq!(database.int_value(), 194);

        drop(database);
        assert_eq!(host.accessor_count(), 0);
    }

    #[test]
    fn test_drop_withdraws_everything() {
        let host = MockHost::new();
        let database = DatarefDatabase::new(host.clone()).unwrap();
        drop(database);

        assert_eq!(host.accessor_count(), 0);
        for name in [INT_DATAREF, INT_ARRAY_DATAREF, STRING_DATAREF] {
            assert!(!host.contains(name), "{} still registered", name);
        }
    }

    #[test]
    fn test_name_collision_is_reported() {
        let host = MockHost::new();
        host.define_i32(INT_DATAREF, 0, true);

        let err = DatarefDatabase::new(host).err().unwrap();
        assert!(format!("{:#}", err).contains("publishing int dataref"));
    }
}
