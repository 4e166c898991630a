use revctl_changeset::{ChangeSet, Manifest, Path};
use revctl_hash::Hash;

fn p(s: &str) -> Path {
    Path::new(s).unwrap()
}

#[test]
fn diff_concatenate_and_invert_compose_consistently() {
    let mut m1 = Manifest::empty();
    m1.insert_for_test(p("a"), Hash::of(b"1"));
    let mut m2 = Manifest::empty();
    m2.insert_for_test(p("a"), Hash::of(b"2"));
    let mut m3 = Manifest::empty();
    m3.insert_for_test(p("b"), Hash::of(b"2"));

    let cs_1_to_2 = ChangeSet::diff_manifests(&m1, &m2);
    let cs_2_to_3 = ChangeSet::diff_manifests(&m2, &m3);

    assert_eq!(cs_1_to_2.apply_to_manifest(&m1).unwrap(), m2);
    assert_eq!(cs_2_to_3.apply_to_manifest(&m2).unwrap(), m3);

    let composed = cs_1_to_2.concatenate(&cs_2_to_3).unwrap();
    assert_eq!(composed.apply_to_manifest(&m1).unwrap(), m3);

    let inv = cs_1_to_2.invert(&m1).unwrap();
    assert_eq!(inv.apply_to_manifest(&m2).unwrap(), m1);
}

#[test]
fn empty_manifest_has_fixed_hash() {
    assert_eq!(
        Manifest::empty().canonical_hash().to_string(),
        "da39a3ee5e6b4b0d3255bfef95601890afd80709"
    );
}

trait InsertForTest {
    fn insert_for_test(&mut self, path: Path, hash: Hash);
}

impl InsertForTest for Manifest {
    fn insert_for_test(&mut self, path: Path, hash: Hash) {
        // Manifest::insert is crate-private; build through canonical bytes
        // instead, matching how a real caller outside the crate would.
        let mut bytes = self.to_canonical_bytes();
        bytes.extend_from_slice(hash.to_string().as_bytes());
        bytes.extend_from_slice(b"  ");
        bytes.extend_from_slice(path.as_str().as_bytes());
        bytes.push(b'\n');
        *self = Manifest::from_canonical_bytes(&bytes).unwrap();
    }
}
