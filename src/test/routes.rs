#[cfg(test)]
mod tests {
    use rocket::http::{ContentType, Status};

    use crate::models::Snapshot;
    use crate::test::utils::test_utils::setup_client;

    #[rocket::async_test]
    async fn index_serves_the_app_shell() {
        let (client, _static_dir) = setup_client(Snapshot::default(), false).await;

        let response = client.get("/").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.content_type(), Some(ContentType::HTML));
    }

    #[rocket::async_test]
    async fn named_assets_are_served_with_inferred_content_types() {
        let (client, static_dir) = setup_client(Snapshot::default(), false).await;

        std::fs::write(static_dir.path().join("manifest.json"), "{}").unwrap();
        std::fs::write(static_dir.path().join("sw.js"), "// worker").unwrap();

        let response = client.get("/manifest.json").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.content_type(), Some(ContentType::JSON));

        let response = client.get("/sw.js").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.content_type(), Some(ContentType::JavaScript));
    }

    #[rocket::async_test]
    async fn source_workbooks_are_never_downloadable() {
        let (client, static_dir) = setup_client(Snapshot::default(), false).await;

        // Even a workbook copied into the static directory stays blocked.
        std::fs::write(static_dir.path().join("InstructorData.xlsx"), b"fake").unwrap();

        for path in [
            "/InstructorData.xlsx",
            "/ProgramRules.xlsx",
            "/GlobalMessages.xlsx",
            "/backup/InstructorData.XLSX",
        ] {
            let response = client.get(path).dispatch().await;
            assert_eq!(response.status(), Status::Forbidden, "{} was not blocked", path);
        }
    }

    #[rocket::async_test]
    async fn missing_assets_answer_plain_404() {
        let (client, _static_dir) = setup_client(Snapshot::default(), false).await;

        let response = client.get("/icon-192.png").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
        assert_eq!(response.content_type(), Some(ContentType::Plain));
    }

    #[rocket::async_test]
    async fn unmatched_methods_answer_404() {
        let (client, _static_dir) = setup_client(Snapshot::default(), false).await;

        let response = client.post("/no/such/endpoint").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
    }
}
