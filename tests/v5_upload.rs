/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
mod helpers;

#[cfg(test)]
mod test {
    use crate::helpers;
    use serde_json::{Value, json};
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use tempfile::tempdir;
    use vkapi::v5::{AttachmentsUploader, UploadTarget, VkError};
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const WALL: UploadTarget = UploadTarget::WallPhoto { group_id: None };

    // Upload server for photos: acknowledges one entry per file part it received
    async fn mount_photo_upload(server: &MockServer, batches: Arc<std::sync::Mutex<Vec<usize>>>) {
        Mock::given(method("POST"))
            .and(path("/upload/photo"))
            .respond_with(move |req: &wiremock::Request| -> ResponseTemplate {
                let files = helpers::file_parts(&req.body);
                batches.lock().unwrap().push(files);
                let list: Vec<Value> = (0..files).map(|n| json!({"photo": format!("p{n}")})).collect();
                ResponseTemplate::new(200).set_body_json(json!({
                    "server": 618,
                    "photo": serde_json::to_string(&list).unwrap(),
                    "hash": "f00d"
                }))
            })
            .mount(server)
            .await;
    }

    // Registers as many photos as the `photo` parameter lists, with increasing ids
    fn saved_photos(req: &wiremock::Request, next_id: &AtomicI64) -> ResponseTemplate {
        let list = req
            .url
            .query_pairs()
            .find(|(k, _)| k == "photo")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        let count = serde_json::from_str::<Vec<Value>>(&list).unwrap().len();
        let photos: Vec<Value> = (0..count)
            .map(|_| json!({"id": next_id.fetch_add(1, Ordering::SeqCst), "owner_id": 100}))
            .collect();
        helpers::vk_response(json!(photos))
    }

    #[tokio::test]
    async fn seven_photos_go_out_as_five_and_two() {
        helpers::init_logging();
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let paths = helpers::write_files(
            &dir,
            &["1.jpg", "2.jpg", "3.jpg", "4.jpg", "5.jpg", "6.jpg", "7.jpg"],
        );

        Mock::given(method("GET"))
            .and(path(helpers::method_path("photos.getWallUploadServer")))
            .respond_with(helpers::upload_server(&server, "photo"))
            .expect(2)
            .mount(&server)
            .await;
        let batches = Arc::new(std::sync::Mutex::new(Vec::new()));
        mount_photo_upload(&server, batches.clone()).await;
        let next_id = Arc::new(AtomicI64::new(5551));
        Mock::given(method("GET"))
            .and(path(helpers::method_path("photos.saveWallPhoto")))
            .and(query_param("server", "618"))
            .and(query_param("hash", "f00d"))
            .respond_with(move |req: &wiremock::Request| saved_photos(req, &next_id))
            .expect(2)
            .mount(&server)
            .await;

        let client = helpers::mock_client(&server, "tok");
        let report = client.upload_all(&WALL, &paths, &[]).await;

        assert!(report.is_complete());
        assert_eq!(report.chunks().len(), 2);
        assert_eq!(report.chunks()[1].paths, paths[5..]);
        assert_eq!(*batches.lock().unwrap(), [5, 2]);
        let refs: Vec<String> = report.references().iter().map(|r| r.to_string()).collect();
        assert_eq!(
            refs,
            [
                "photo100_5551",
                "photo100_5552",
                "photo100_5553",
                "photo100_5554",
                "photo100_5555",
                "photo100_5556",
                "photo100_5557"
            ]
        );
    }

    #[tokio::test]
    async fn files_within_ceiling_are_one_batch() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let paths = helpers::write_files(&dir, &["a.jpg", "b.jpg", "c.jpg"]);

        Mock::given(path(helpers::method_path("photos.getUploadServer")))
            .and(query_param("album_id", "14"))
            .and(query_param("group_id", "42"))
            .respond_with(helpers::upload_server(&server, "album"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload/album"))
            .respond_with(move |req: &wiremock::Request| -> ResponseTemplate {
                let body = String::from_utf8_lossy(&req.body).into_owned();
                assert!(body.contains("name=\"file3\""));
                assert!(!body.contains("name=\"file4\""));
                ResponseTemplate::new(200).set_body_json(json!({
                    "server": "618", "photos_list": "[{},{},{}]", "aid": 14, "hash": "h"
                }))
            })
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path(helpers::method_path("photos.save")))
            .and(query_param("photos_list", "[{},{},{}]"))
            .and(query_param("album_id", "14"))
            .respond_with(helpers::vk_response(json!([
                {"id": 1, "owner_id": -42},
                {"id": 2, "owner_id": -42},
                {"id": 3, "owner_id": -42}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = helpers::mock_client(&server, "tok");
        let target = UploadTarget::AlbumPhoto {
            group_id: Some(42),
            album_id: 14,
        };
        let (refs, err) = client.upload_all(&target, &paths, &[]).await.into_parts();
        assert!(err.is_none());
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[2].to_string(), "photo-42_3");
    }

    #[tokio::test]
    async fn failed_second_batch_keeps_first_batch_references() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let paths = helpers::write_files(
            &dir,
            &["1.jpg", "2.jpg", "3.jpg", "4.jpg", "5.jpg", "6.jpg", "7.jpg"],
        );

        Mock::given(path(helpers::method_path("photos.getWallUploadServer")))
            .respond_with(helpers::upload_server(&server, "photo"))
            .mount(&server)
            .await;
        mount_photo_upload(&server, Arc::new(std::sync::Mutex::new(Vec::new()))).await;
        let saves = Arc::new(AtomicUsize::new(0));
        let next_id = Arc::new(AtomicI64::new(1));
        Mock::given(path(helpers::method_path("photos.saveWallPhoto")))
            .respond_with(move |req: &wiremock::Request| -> ResponseTemplate {
                if saves.fetch_add(1, Ordering::SeqCst) == 0 {
                    saved_photos(req, &next_id)
                } else {
                    helpers::vk_error(100, "One of the parameters specified was missing or invalid")
                }
            })
            .expect(2)
            .mount(&server)
            .await;

        let client = helpers::mock_client(&server, "tok");
        let report = client.upload_all(&WALL, &paths, &[]).await;
        assert!(report.chunks()[0].result.is_ok());
        assert!(matches!(report.last_error(), Some(VkError::ApiResponse(100, _))));

        let (refs, err) = report.into_parts();
        assert_eq!(refs.len(), 5);
        assert!(matches!(err, Some(VkError::ApiResponse(100, _))));
    }

    #[tokio::test]
    async fn rejected_upload_is_an_error() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let paths = helpers::write_files(&dir, &["a.jpg"]);

        Mock::given(path(helpers::method_path("photos.getWallUploadServer")))
            .respond_with(helpers::upload_server(&server, "photo"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload/photo"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"error": "ERR_UPLOAD_BAD_IMAGE_SIZE"})),
            )
            .mount(&server)
            .await;
        Mock::given(path(helpers::method_path("photos.saveWallPhoto")))
            .respond_with(helpers::vk_response(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let client = helpers::mock_client(&server, "tok");
        let err = client.upload_batch(&WALL, &paths, &[]).await.unwrap_err();
        assert!(matches!(err, VkError::UploadRejected(ref msg) if msg == "ERR_UPLOAD_BAD_IMAGE_SIZE"));
    }

    #[tokio::test]
    async fn missing_file_fails_before_posting() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();

        Mock::given(path(helpers::method_path("docs.getWallUploadServer")))
            .respond_with(helpers::upload_server(&server, "doc"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = helpers::mock_client(&server, "tok");
        let target = UploadTarget::WallDoc { group_id: None };
        let err = client
            .upload_batch(&target, &[dir.path().join("absent.pdf")], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, VkError::Io(_)));
    }

    #[tokio::test]
    async fn doc_without_extension_is_sent_as_dat() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let paths = helpers::write_files(&dir, &["notes"]);

        Mock::given(path(helpers::method_path("docs.getUploadServer")))
            .respond_with(helpers::upload_server(&server, "doc"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload/doc"))
            .respond_with(move |req: &wiremock::Request| -> ResponseTemplate {
                let body = String::from_utf8_lossy(&req.body).into_owned();
                assert!(body.contains("name=\"file\"; filename=\"notes.dat\""));
                assert!(body.contains("contents of notes"));
                ResponseTemplate::new(200).set_body_json(json!({"file": "blob-1"}))
            })
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path(helpers::method_path("docs.save")))
            .and(query_param("file", "blob-1"))
            .and(query_param("title", "notes"))
            .and(query_param("tags", "notes"))
            .respond_with(helpers::vk_response(json!([{"id": 9, "owner_id": 100, "title": "notes"}])))
            .expect(1)
            .mount(&server)
            .await;

        let client = helpers::mock_client(&server, "tok");
        let target = UploadTarget::Doc { group_id: None };
        let (refs, err) = client.upload_all(&target, &paths, &[]).await.into_parts();
        assert!(err.is_none());
        assert_eq!(refs[0].to_string(), "doc100_9");
    }

    #[tokio::test]
    async fn video_is_buffered_and_not_registered() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let paths = helpers::write_files(&dir, &["clip.mp4"]);

        Mock::given(path(helpers::method_path("video.save")))
            .respond_with(helpers::vk_response(json!({
                "upload_url": format!("{}/upload/video", server.uri()),
                "video_id": 456,
                "owner_id": 100,
                "title": "clip.mp4"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload/video"))
            .and(header_exists("content-length"))
            .respond_with(move |req: &wiremock::Request| -> ResponseTemplate {
                let body = String::from_utf8_lossy(&req.body).into_owned();
                assert!(body.contains("name=\"video_file\"; filename=\"clip.mp4\""));
                ResponseTemplate::new(200).set_body_json(json!({"size": 20, "video_id": 456}))
            })
            .expect(1)
            .mount(&server)
            .await;

        let client = helpers::mock_client(&server, "tok");
        let uploaded = AttachmentsUploader::new(client)
            .add_video(&paths[0], None)
            .upload()
            .await
            .unwrap();
        assert_eq!(uploaded.attachment_list(), "video100_456");
    }

    #[tokio::test]
    async fn wall_attachments_are_uploaded_in_kind_order() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let paths = helpers::write_files(&dir, &["pic.jpg", "song.mp3", "report.pdf"]);

        Mock::given(path(helpers::method_path("photos.getWallUploadServer")))
            .respond_with(helpers::upload_server(&server, "photo"))
            .mount(&server)
            .await;
        mount_photo_upload(&server, Arc::new(std::sync::Mutex::new(Vec::new()))).await;
        let next_id = Arc::new(AtomicI64::new(70));
        Mock::given(path(helpers::method_path("photos.saveWallPhoto")))
            .respond_with(move |req: &wiremock::Request| saved_photos(req, &next_id))
            .mount(&server)
            .await;

        Mock::given(path(helpers::method_path("audio.getUploadServer")))
            .respond_with(helpers::upload_server(&server, "audio"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload/audio"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "server": 3, "audio": "blob-a", "hash": "ha"
            })))
            .mount(&server)
            .await;
        Mock::given(path(helpers::method_path("audio.save")))
            .and(query_param("audio", "blob-a"))
            .respond_with(helpers::vk_response(json!({"id": 2, "owner_id": 100, "artist": "x"})))
            .mount(&server)
            .await;

        Mock::given(path(helpers::method_path("docs.getWallUploadServer")))
            .respond_with(helpers::upload_server(&server, "doc"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload/doc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"file": "blob-d"})))
            .mount(&server)
            .await;
        Mock::given(path(helpers::method_path("docs.save")))
            .and(query_param("title", "Q3 report.pdf"))
            .respond_with(helpers::vk_response(json!({
                "type": "doc", "doc": {"id": 8, "owner_id": 100}
            })))
            .mount(&server)
            .await;

        let client = helpers::mock_client(&server, "tok");
        let uploaded = AttachmentsUploader::new(client)
            .add_photo(&paths[0], None)
            .add_doc(&paths[2], Some("Q3 report.pdf"))
            .add_audio(&paths[1], None)
            .upload()
            .await
            .unwrap();
        assert_eq!(uploaded.to_string(), "audio100_2,doc100_8,photo100_70");
    }

    #[tokio::test]
    async fn large_doc_is_streamed_without_length() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let big_file = dir.path().join("big.bin");
        let data: Vec<u8> = (0..200_003u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&big_file, &data).unwrap();

        Mock::given(path(helpers::method_path("docs.getUploadServer")))
            .respond_with(helpers::upload_server(&server, "doc"))
            .mount(&server)
            .await;
        let received = Arc::new(std::sync::Mutex::new(None));
        let received_clone = received.clone();
        let expected = data.clone();
        Mock::given(method("POST"))
            .and(path("/upload/doc"))
            .respond_with(move |req: &wiremock::Request| -> ResponseTemplate {
                let intact = req
                    .body
                    .windows(expected.len())
                    .any(|w| w == expected.as_slice());
                let has_length = req.headers.contains_key("content-length");
                *received_clone.lock().unwrap() = Some((intact, has_length));
                ResponseTemplate::new(200).set_body_json(json!({"file": "blob-big"}))
            })
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path(helpers::method_path("docs.save")))
            .and(query_param("file", "blob-big"))
            .respond_with(helpers::vk_response(json!([{"id": 12, "owner_id": 100}])))
            .mount(&server)
            .await;

        let client = helpers::mock_client(&server, "tok");
        let target = UploadTarget::Doc { group_id: None };
        let (refs, err) = client.upload_all(&target, &[big_file], &[]).await.into_parts();
        assert!(err.is_none());
        assert_eq!(refs[0].to_string(), "doc100_12");

        let (intact, has_length) = received.lock().unwrap().take().unwrap();
        assert!(intact);
        assert!(!has_length);
    }

    #[tokio::test]
    async fn empty_paths_are_skipped_and_fields_stay_contiguous() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let files = helpers::write_files(&dir, &["a.jpg", "b.jpg"]);
        let paths = vec![files[0].clone(), PathBuf::new(), files[1].clone()];

        Mock::given(path(helpers::method_path("photos.getWallUploadServer")))
            .respond_with(helpers::upload_server(&server, "photo"))
            .expect(1)
            .mount(&server)
            .await;
        let bodies = Arc::new(std::sync::Mutex::new(Vec::new()));
        let bodies_clone = bodies.clone();
        Mock::given(method("POST"))
            .and(path("/upload/photo"))
            .respond_with(move |req: &wiremock::Request| -> ResponseTemplate {
                bodies_clone
                    .lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&req.body).into_owned());
                ResponseTemplate::new(200).set_body_json(json!({
                    "server": 618, "photo": "[{},{}]", "hash": "f00d"
                }))
            })
            .expect(1)
            .mount(&server)
            .await;
        let next_id = Arc::new(AtomicI64::new(1));
        Mock::given(path(helpers::method_path("photos.saveWallPhoto")))
            .respond_with(move |req: &wiremock::Request| saved_photos(req, &next_id))
            .expect(1)
            .mount(&server)
            .await;

        let client = helpers::mock_client(&server, "tok");
        let (refs, err) = client.upload_all(&WALL, &paths, &[]).await.into_parts();
        assert!(err.is_none());
        assert_eq!(refs.len(), 2);

        let bodies = bodies.lock().unwrap();
        assert_eq!(helpers::file_parts(bodies[0].as_bytes()), 2);
        assert!(bodies[0].contains("name=\"file1\""));
        assert!(bodies[0].contains("name=\"file2\""));
        assert!(!bodies[0].contains("name=\"file3\""));
    }

    #[tokio::test]
    async fn community_message_sends_audio_as_group_doc() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let paths = helpers::write_files(&dir, &["song.mp3", "pic.jpg", "clip.mp4"]);

        Mock::given(path(helpers::method_path("video.save")))
            .and(query_param("access_token", "user-token"))
            .and(query_param("group_id", "42"))
            .respond_with(helpers::vk_response(json!({
                "upload_url": format!("{}/upload/video", server.uri()),
                "video_id": 77,
                "owner_id": -42
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload/video"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"size": 22, "video_id": 77})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(path(helpers::method_path("docs.getWallUploadServer")))
            .and(query_param("access_token", "user-token"))
            .and(query_param("group_id", "42"))
            .respond_with(helpers::upload_server(&server, "doc"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload/doc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"file": "blob-d"})))
            .mount(&server)
            .await;
        Mock::given(path(helpers::method_path("docs.save")))
            .and(query_param("access_token", "user-token"))
            .and(query_param("title", "track.mp3"))
            .respond_with(helpers::vk_response(json!([{"id": 9, "owner_id": -42}])))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(path(helpers::method_path("photos.getMessagesUploadServer")))
            .and(query_param("access_token", "group-token"))
            .respond_with(helpers::upload_server(&server, "photo"))
            .expect(1)
            .mount(&server)
            .await;
        mount_photo_upload(&server, Arc::new(std::sync::Mutex::new(Vec::new()))).await;
        Mock::given(path(helpers::method_path("photos.saveMessagesPhoto")))
            .and(query_param("access_token", "group-token"))
            .respond_with(helpers::vk_response(json!([{"id": 31, "owner_id": -42}])))
            .expect(1)
            .mount(&server)
            .await;

        let user = helpers::mock_client(&server, "user-token");
        let group = helpers::mock_client(&server, "group-token");
        let uploaded = AttachmentsUploader::community_messages(user, group, 42)
            .add_photo(&paths[1], None)
            .add_audio(&paths[0], Some("track.mp3"))
            .add_video(&paths[2], None)
            .upload()
            .await
            .unwrap();
        assert_eq!(uploaded.attachment_list(), "video-42_77,doc-42_9,photo-42_31");
    }

    #[tokio::test]
    async fn failed_kind_stops_the_upload() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let paths = helpers::write_files(&dir, &["song.mp3", "pic.jpg"]);

        Mock::given(path(helpers::method_path("audio.getUploadServer")))
            .respond_with(helpers::vk_error(15, "Access denied"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path(helpers::method_path("photos.getWallUploadServer")))
            .respond_with(helpers::upload_server(&server, "photo"))
            .expect(0)
            .mount(&server)
            .await;

        let client = helpers::mock_client(&server, "tok");
        let err = AttachmentsUploader::new(client)
            .add_photo(&paths[1], None)
            .add_audio(&paths[0], None)
            .upload()
            .await
            .unwrap_err();
        assert_eq!(err.api_code(), Some(15));
    }
}
