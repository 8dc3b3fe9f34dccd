//! Helpers shared by the fuzz tests. Lives in the crate (rather than each
//! test file) so the integration tests and any future fuzz targets agree on
//! what a "random edit" looks like.

use rand::prelude::*;

use crate::list::ListCRDT;

const ALPHABET: &[u8] = b" abcdefghijklmnopqrstuvwxyz";

fn random_char(rng: &mut SmallRng) -> char {
    ALPHABET[rng.gen_range(0..ALPHABET.len())] as char
}

/// Make one random change to the document - mostly single character inserts,
/// with short deletes mixed in once the document has some content. If a
/// reference copy is passed, the same change is mirrored there.
pub fn make_random_change(doc: &mut ListCRDT, reference: Option<&mut Vec<char>>, rng: &mut SmallRng) {
    let len = doc.len();
    let insert_weight = if len < 100 { 0.65 } else { 0.35 };

    if len == 0 || rng.gen_bool(insert_weight) {
        let pos = rng.gen_range(0..=len);
        let c = random_char(rng);
        doc.local_insert(pos, &c.to_string());
        if let Some(reference) = reference {
            reference.insert(pos, c);
        }
    } else {
        let pos = rng.gen_range(0..len);
        let max_del = usize::min(len - pos, 3);
        let del_len = rng.gen_range(0..=max_del);
        doc.local_delete(pos, del_len);
        if let Some(reference) = reference {
            reference.drain(pos..pos + del_len);
        }
    }
}
