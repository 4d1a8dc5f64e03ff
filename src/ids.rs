use std::sync::Arc;

use rand::Rng;
use uuid::Uuid;

use crate::config::IdScheme;

/// Source of submission ids. Ids are opaque strings and must never repeat.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Time-ordered UUIDv7 ids.
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self) -> String {
        Uuid::now_v7().simple().to_string()
    }
}

/// Two random base-36 fragments, the format of ids written by earlier
/// deployments. Not cryptographically secure.
pub struct Base36Ids;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const FRAGMENT_LEN: usize = 13;

impl IdGenerator for Base36Ids {
    fn next_id(&self) -> String {
        let mut rng = rand::rng();
        let mut id = fragment(&mut rng);
        id.push_str(&fragment(&mut rng));
        id
    }
}

fn fragment(rng: &mut impl Rng) -> String {
    (0..FRAGMENT_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect()
}

pub fn from_scheme(scheme: IdScheme) -> Arc<dyn IdGenerator> {
    match scheme {
        IdScheme::Uuid => Arc::new(UuidIds),
        IdScheme::Base36 => Arc::new(Base36Ids),
    }
}
