//! Incremental record extraction via `DeserializeSeed`

use std::fmt;
use std::io::Read;
use std::marker::PhantomData;

use serde::de::{DeserializeOwned, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use tracing::trace;

/// Stream the record array held under `key` out of a JSON envelope
/// object, invoking `consumer` once per complete record, in document
/// order. Envelope keys other than `key` are skipped without building
/// values for them.
///
/// Returns the number of records delivered. A record is only handed to
/// the consumer once it deserialized completely, so the consumer never
/// sees partial data; records delivered before a mid-document error stay
/// delivered.
pub fn extract_records<R, T, F>(
    body: R,
    key: &'static str,
    consumer: &mut F,
) -> Result<usize, serde_json::Error>
where
    R: Read,
    T: DeserializeOwned,
    F: FnMut(T),
{
    let mut de = serde_json::Deserializer::from_reader(body);
    let delivered = EnvelopeSeed {
        key,
        consumer,
        _record: PhantomData::<fn(T)>,
    }
    .deserialize(&mut de)?;
    de.end()?;
    Ok(delivered)
}

/// Walks the envelope object looking for the record array.
struct EnvelopeSeed<'c, T, F> {
    key: &'static str,
    consumer: &'c mut F,
    _record: PhantomData<fn(T)>,
}

impl<'de, T, F> DeserializeSeed<'de> for EnvelopeSeed<'_, T, F>
where
    T: DeserializeOwned,
    F: FnMut(T),
{
    type Value = usize;

    fn deserialize<D>(self, deserializer: D) -> Result<usize, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }
}

impl<'de, T, F> Visitor<'de> for EnvelopeSeed<'_, T, F>
where
    T: DeserializeOwned,
    F: FnMut(T),
{
    type Value = usize;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a response object with a `{}` array", self.key)
    }

    fn visit_map<A>(self, mut map: A) -> Result<usize, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut delivered = 0;
        while let Some(name) = map.next_key::<String>()? {
            if name == self.key {
                delivered += map.next_value_seed(RecordSeq {
                    consumer: &mut *self.consumer,
                    _record: PhantomData::<fn(T)>,
                })?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(delivered)
    }
}

/// Drains the record array one element at a time.
struct RecordSeq<'c, T, F> {
    consumer: &'c mut F,
    _record: PhantomData<fn(T)>,
}

impl<'de, T, F> DeserializeSeed<'de> for RecordSeq<'_, T, F>
where
    T: DeserializeOwned,
    F: FnMut(T),
{
    type Value = usize;

    fn deserialize<D>(self, deserializer: D) -> Result<usize, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de, T, F> Visitor<'de> for RecordSeq<'_, T, F>
where
    T: DeserializeOwned,
    F: FnMut(T),
{
    type Value = usize;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of records")
    }

    fn visit_seq<A>(mut self, mut seq: A) -> Result<usize, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut delivered = 0;
        while let Some(record) = seq.next_element::<T>()? {
            (self.consumer)(record);
            delivered += 1;
            trace!(delivered, "record delivered");
        }
        Ok(delivered)
    }
}
