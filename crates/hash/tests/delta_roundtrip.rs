use revctl_hash::{apply, diff, Hash};

#[test]
fn hash_and_delta_compose_over_a_short_edit_history() {
    let v1 = b"line one\nline two\nline three\n".to_vec();
    let v2 = b"line one\nline TWO\nline three\nline four\n".to_vec();
    let v3 = b"line one\nline three\nline four\n".to_vec();

    let h1 = Hash::of(&v1);
    let h2 = Hash::of(&v2);
    let h3 = Hash::of(&v3);
    assert_ne!(h1, h2);
    assert_ne!(h2, h3);

    // Reverse-delta convention: newest version is the base, older versions
    // are deltas against it.
    let delta_v2_to_v1 = diff(&v2, &v1);
    let delta_v3_to_v2 = diff(&v3, &v2);

    assert_eq!(apply(&delta_v2_to_v1, &v2).unwrap(), v1);
    assert_eq!(apply(&delta_v3_to_v2, &v3).unwrap(), v2);
}

#[test]
fn blob_round_trip_preserves_binary_content() {
    let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    let encoded = revctl_hash::encode_blob(&payload);
    let decoded = revctl_hash::decode_blob(&encoded).unwrap();
    assert_eq!(decoded, payload);
}
