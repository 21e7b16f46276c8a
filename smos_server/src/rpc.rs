//! Dispatches one [`Request`] against a shared `Store`, translating every
//! `Result<_, SmosError>` into the matching [`Response`] variant. Panics
//! from invariant violations are deliberately left unhandled here; see
//! `crate::connection` for where they are caught.

use smos_common::wire::{Request, Response, WireError};
use smos_store::Store;

fn to_response<T>(result: Result<T, smos_common::error::SmosError>, on_ok: impl FnOnce(T) -> Response) -> Response {
    match result {
        Ok(v) => on_ok(v),
        Err(e) => Response::Err(WireError::from(&e)),
    }
}

pub fn dispatch(store: &Store, request: Request) -> Response {
    match request {
        Request::CreateObject {
            name,
            max_capacity,
            block_size_list,
            track_name_list,
        } => to_response(
            store.create_object(&name, max_capacity, &block_size_list, track_name_list.as_deref()),
            |_| Response::Object,
        ),
        Request::RemoveObject { name } => {
            to_response(store.remove_object(&name), |_| Response::Ok)
        }
        Request::AllocateBlock { name, mut descs } => {
            to_response(store.allocate_block(&name, &mut descs), move |_| {
                Response::Entries(descs)
            })
        }
        Request::AppendEntryConfig { name, descs } => {
            to_response(store.append_entry_config(&name, descs), Response::Key)
        }
        Request::ReadEntryConfig { name, key } => {
            to_response(store.read_entry_config(&name, key), Response::Entries)
        }
        Request::ReadLatestEntryConfig { name } => {
            to_response(store.read_latest_entry_config(&name), |(key, entries)| {
                Response::KeyedEntries(key, entries)
            })
        }
        Request::BatchReadEntryConfig { name, keys } => {
            to_response(store.batch_read_entry_config(&name, &keys), Response::BatchEntries)
        }
        Request::ReleaseReadReference { name, key } => {
            to_response(store.release_read_reference(&name, key), |_| Response::Ok)
        }
        Request::DeleteEntryConfig { name, key, force } => {
            to_response(store.delete_entry_config(&name, key, force), |_| Response::Ok)
        }
        Request::PopEntryConfig { name, force } => {
            to_response(store.pop_entry_config(&name, force), Response::Entries)
        }
        Request::FreeBlockMapping { name, descs } => {
            to_response(store.free_block_mapping(&name, &descs), |_| Response::Ok)
        }
        Request::GetEntryOffset { name, descs } => {
            to_response(store.get_entry_offset(&name, &descs), Response::Offsets)
        }
        Request::BatchGetEntryOffset { requests } => {
            let results = store
                .batch_get_entry_offset(&requests)
                .into_iter()
                .map(|r| r.map_err(|e| WireError::from(&e)))
                .collect();
            Response::BatchOffsets(results)
        }
        Request::GetBlockSizeList { name } => {
            to_response(store.get_block_size_list(&name), Response::Sizes)
        }
        Request::GetShmNameList { name } => {
            to_response(store.get_shm_name_list(&name), Response::Names)
        }
        Request::GetTrackCount { name } => {
            to_response(store.get_track_count(&name), Response::Count)
        }
        Request::GetEntryCount { name } => {
            to_response(store.get_entry_count(&name), Response::Count)
        }
        Request::GetEntryIdxList { name } => {
            to_response(store.get_entry_idx_list(&name), Response::Keys)
        }
        Request::Profile => Response::Profile(store.profile()),
    }
}
