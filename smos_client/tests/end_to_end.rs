//! Drives a real coordinator over a loopback TCP connection, exercising
//! the client handle lifecycle end to end.

use smos_client::Client;
use smos_common::descriptor::Dtype;
use smos_server::run_coordinator;

async fn spawn_coordinator() -> (u16, smos_server::CoordinatorHandle) {
    let handle = run_coordinator(16000, 16100, "test-key".to_string())
        .await
        .expect("coordinator should bind a free port");
    (handle.port, handle)
}

fn client_for(port: u16) -> Client {
    Client::connect(("127.0.0.1", port), "test-key").expect("client should connect")
}

#[tokio::test]
async fn create_push_pop_cycle() {
    let (port, mut coordinator) = spawn_coordinator().await;
    let client = tokio::task::spawn_blocking(move || -> Client { client_for(port) })
        .await
        .unwrap();

    tokio::task::spawn_blocking(move || {
        client.create_object("q", 4, &[128], None).unwrap();

        for _ in 0..4 {
            let handle = client
                .create_entry("q", &[Dtype::U8], &[vec![128]], &[false])
                .unwrap();
            client.commit_entry(handle).unwrap();
        }

        for _ in 0..4 {
            let popped = client.pop_from_object("q", false).unwrap();
            client.free_handle(popped).unwrap();
        }

        // a fifth pop on the now-empty object fails
        assert!(client.pop_from_object("q", false).is_err());
    })
    .await
    .unwrap();

    coordinator.shutdown();
}

#[tokio::test]
async fn reader_blocks_delete_until_released() {
    let (port, mut coordinator) = spawn_coordinator().await;
    let client = tokio::task::spawn_blocking(move || client_for(port)).await.unwrap();

    tokio::task::spawn_blocking(move || {
        client.create_object("r", 2, &[64], None).unwrap();
        let handle = client
            .create_entry("r", &[Dtype::U8], &[vec![64]], &[false])
            .unwrap();
        let key = client.commit_entry(handle).unwrap();

        let read_handle = client.open_entry("r", key).unwrap();
        assert!(client.delete_entry("r", key, false).is_err());
        client.release_entry(read_handle).unwrap();
        client.delete_entry("r", key, false).unwrap();
    })
    .await
    .unwrap();

    coordinator.shutdown();
}

#[tokio::test]
async fn numeric_round_trip() {
    let (port, mut coordinator) = spawn_coordinator().await;
    let client = tokio::task::spawn_blocking(move || client_for(port)).await.unwrap();

    tokio::task::spawn_blocking(move || {
        client.create_object("arr", 2, &[32], None).unwrap();
        let mut handle = client
            .create_entry("arr", &[Dtype::F32], &[vec![4]], &[true])
            .unwrap();
        handle.open_shm().unwrap();
        {
            let bytes = handle.bytes_mut(0).unwrap();
            let values: [f32; 4] = [1.0, 2.0, 3.0, 4.0];
            bytes.copy_from_slice(floats_as_bytes(&values));
        }
        let key = client.commit_entry(handle).unwrap();

        let mut read_back = client.open_entry("arr", key).unwrap();
        read_back.open_shm().unwrap();
        assert_eq!(read_back.as_f32(0).unwrap(), &[1.0, 2.0, 3.0, 4.0]);
        client.release_entry(read_back).unwrap();
    })
    .await
    .unwrap();

    coordinator.shutdown();
}

fn floats_as_bytes(values: &[f32; 4]) -> &[u8] {
    unsafe { std::slice::from_raw_parts(values.as_ptr() as *const u8, std::mem::size_of_val(values)) }
}
