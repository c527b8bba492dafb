mod common;

use serde_json::{json, Value};
use xero_api::{
    Client, ClientConfig, Error, Limits, Method, Params, Payload, PayloadCodec, Response,
    TransportError, XmlJsonCodec,
};

use common::*;

fn params(pairs: &[(&str, &str)]) -> Params {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn records(response: Response) -> Vec<Value> {
    match response {
        Response::Records(records) => records,
        other => panic!("expected aggregated records, got {:?}", other),
    }
}

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn paginates_until_empty_page() {
    let sizes = [50, 50, 50, 0];
    let exec = ScriptedExecutor::new(move |i, _| Ok(contact_page(i + 1, sizes[i])));
    let client = Client::new(exec.clone());

    let result = records(client.get("/Contacts", None).await.unwrap());

    assert_eq!(result.len(), 150);
    assert_eq!(result[0]["Name"], "p1-0");
    assert_eq!(result[50]["Name"], "p2-0");
    assert_eq!(result[149]["Name"], "p3-49");

    let requests = exec.requests();
    assert_eq!(requests.len(), 4);
    for (i, request) in requests.iter().enumerate() {
        assert_eq!(request.method, Method::Get);
        assert_eq!(query(request, "page"), Some((i + 1).to_string()));
        assert_eq!(query(request, "summarizeErrors").as_deref(), Some("false"));
        assert!(request.body.is_none());
        assert!(request.content_type.is_none());
    }
}

#[tokio::test]
async fn pagination_error_discards_fetched_pages() {
    let exec = ScriptedExecutor::new(|i, _| match i {
        1 => Err(TransportError::Status {
            status: 500,
            body: "Internal Server Error".to_string(),
        }),
        _ => Ok(contact_page(i + 1, 50)),
    });
    let client = Client::new(exec.clone());

    let err = client.get("/Contacts", None).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Transport(TransportError::Status { status: 500, .. })
    ));
    assert_eq!(exec.requests().len(), 2);
}

#[tokio::test]
async fn pagination_forwards_caller_params_on_every_page() {
    let exec = ScriptedExecutor::new(|i, _| Ok(contact_page(i + 1, if i < 2 { 3 } else { 0 })));
    let client = Client::new(exec.clone());
    let filter = params(&[("where", "ContactStatus==\"ACTIVE\""), ("order", "Name")]);

    let result = records(client.get("/Contacts", Some(&filter)).await.unwrap());

    assert_eq!(result.len(), 6);
    for request in exec.requests() {
        assert_eq!(
            query(&request, "where").as_deref(),
            Some("ContactStatus==\"ACTIVE\"")
        );
        assert_eq!(query(&request, "order").as_deref(), Some("Name"));
    }
}

#[tokio::test]
async fn missing_collection_key_ends_pagination() {
    let exec = ScriptedExecutor::new(|_, _| Ok(json!({"Status": "OK"}).to_string()));
    let client = Client::new(exec.clone());

    let result = records(client.get("/Contacts", None).await.unwrap());

    assert!(result.is_empty());
    assert_eq!(exec.requests().len(), 1);
}

#[tokio::test]
async fn explicit_page_is_a_single_request() {
    let exec = ScriptedExecutor::new(|_, _| Ok(contact_page(2, 100)));
    let client = Client::new(exec.clone());

    let response = client
        .get("/Contacts", Some(&params(&[("page", "2")])))
        .await
        .unwrap();

    let Response::Payload(Payload::Json(body)) = &response else {
        panic!("expected a direct payload, got {:?}", response);
    };
    assert_eq!(body["Contacts"].as_array().map(Vec::len), Some(100));
    assert_eq!(response.into_records("Contacts").len(), 100);

    let requests = exec.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(query(&requests[0], "page").as_deref(), Some("2"));
}

#[tokio::test]
async fn page_in_path_query_is_a_single_request() {
    let exec = ScriptedExecutor::new(|_, _| Ok(contact_page(3, 1)));
    let client = Client::new(exec.clone());

    let response = client.get("/Contacts?page=3", None).await.unwrap();

    assert!(matches!(response, Response::Payload(_)));
    assert_eq!(exec.requests().len(), 1);
}

// ============================================================================
// Response decoding
// ============================================================================

#[tokio::test]
async fn non_json_success_body_is_returned_raw() {
    let exec = ScriptedExecutor::new(|_, _| Ok("Accepted".to_string()));
    let client = Client::new(exec);

    let response = client
        .get("/Reports", Some(&params(&[("page", "1")])))
        .await
        .unwrap();

    assert_eq!(response, Response::Payload(Payload::Raw("Accepted".to_string())));
}

#[tokio::test]
async fn unstructured_collection_read_is_returned_raw() {
    let exec = ScriptedExecutor::new(|_, _| Ok("plain text report".to_string()));
    let client = Client::new(exec.clone());

    let response = client.get("/Reports", None).await.unwrap();

    assert_eq!(
        response,
        Response::Payload(Payload::Raw("plain text report".to_string()))
    );
    let requests = exec.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(query(&requests[0], "page").as_deref(), Some("1"));
}

#[tokio::test]
async fn unstructured_later_page_fails_instead_of_truncating() {
    let exec = ScriptedExecutor::new(|i, _| match i {
        0 => Ok(contact_page(1, 50)),
        _ => Ok("<html>maintenance</html>".to_string()),
    });
    let client = Client::new(exec.clone());

    let err = client.get("/Contacts", None).await.unwrap_err();

    match err {
        Error::UnstructuredPage {
            page,
            fetched,
            body,
        } => {
            assert_eq!(page, 2);
            assert_eq!(fetched, 50);
            assert_eq!(body, "<html>maintenance</html>");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(exec.requests().len(), 2);
}

#[tokio::test]
async fn empty_success_body_is_returned_raw() {
    let exec = ScriptedExecutor::new(|_, _| Ok(String::new()));
    let client = Client::new(exec);

    let response = client.delete("/Items/abc", None).await.unwrap();

    assert_eq!(response, Response::Payload(Payload::Raw(String::new())));
}

#[tokio::test]
async fn non_ok_status_in_success_body_is_a_service_error() {
    let exec = ScriptedExecutor::new(|_, _| {
        Ok(json!({"Status": "UNAUTHORISED", "Message": "Organisation offline"}).to_string())
    });
    let client = Client::new(exec);

    let err = client
        .get("/Contacts", Some(&params(&[("page", "1")])))
        .await
        .unwrap_err();

    match err {
        Error::Service { status, detail } => {
            assert_eq!(status, None);
            assert_eq!(detail.status.as_deref(), Some("UNAUTHORISED"));
            assert_eq!(detail.message.as_deref(), Some("Organisation offline"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn validation_error_body_is_normalized() {
    let exec =
        ScriptedExecutor::new(|_, _| Err(validation_failure("Email address must be valid.")));
    let client = Client::new(exec);

    let err = client
        .post("/Contacts", &numbered_contacts(3), None)
        .await
        .unwrap_err();

    match err {
        Error::Service { status, detail } => {
            assert_eq!(status, Some(400));
            assert_eq!(detail.kind.as_deref(), Some("ValidationException"));
            assert_eq!(
                detail.validation_messages(),
                vec!["Email address must be valid."]
            );
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn unparseable_error_body_stays_a_transport_error() {
    let exec = ScriptedExecutor::new(|_, _| {
        Err(TransportError::Status {
            status: 401,
            body: "oauth_problem=signature_invalid".to_string(),
        })
    });
    let client = Client::new(exec);

    let err = client.get("/Contacts", None).await.unwrap_err();

    match err {
        Error::Transport(TransportError::Status { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "oauth_problem=signature_invalid");
        }
        other => panic!("unexpected {:?}", other),
    }
}

// ============================================================================
// Writes and batching
// ============================================================================

#[tokio::test]
async fn small_write_is_one_request() {
    let exec = ScriptedExecutor::new(|_, request| Ok(echo(request)));
    let client = Client::new(exec.clone());
    let body = numbered_contacts(200);

    let result = records(client.put("/Contacts", &body, None).await.unwrap());

    assert_eq!(record_names(&result), record_names(&body));
    let requests = exec.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::Put);
    assert_eq!(requests[0].content_type.as_deref(), Some("application/xml"));
    assert_eq!(query(&requests[0], "summarizeErrors").as_deref(), Some("false"));
}

#[tokio::test]
async fn element_ceiling_splits_into_chunks() {
    let exec = ScriptedExecutor::new(|_, request| Ok(echo(request)));
    let client = Client::new(exec.clone());
    let body = numbered_contacts(201);

    let result = records(client.post("/Contacts", &body, None).await.unwrap());

    assert_eq!(record_names(&result), record_names(&body));
    let sent: Vec<usize> = exec
        .requests()
        .iter()
        .map(|r| names_in(r.body.as_deref().unwrap()).len())
        .collect();
    assert_eq!(sent, vec![200, 1]);
}

#[tokio::test]
async fn size_threshold_splits_into_sub_batches() {
    let body = numbered_contacts(450);
    let encoded = XmlJsonCodec::new().encode("Contacts", &body).unwrap();
    // An estimate of exactly twice the threshold plans two size batches of
    // 225 records, each of which is chunked again by the 200-record ceiling.
    let limits = Limits {
        max_payload_bytes: encoded.len(),
        payload_threshold_bytes: encoded.len(),
        ..Limits::default()
    };
    let exec = ScriptedExecutor::new(|_, request| Ok(echo(request)));
    let client = Client::with_config(
        exec.clone(),
        ClientConfig {
            limits,
            ..ClientConfig::default()
        },
    )
    .unwrap();

    let result = records(client.put("/Contacts", &body, None).await.unwrap());

    assert_eq!(record_names(&result), record_names(&body));
    let sent: Vec<usize> = exec
        .requests()
        .iter()
        .map(|r| names_in(r.body.as_deref().unwrap()).len())
        .collect();
    assert_eq!(sent, vec![200, 25, 200, 25]);
}

#[tokio::test]
async fn failed_batch_stops_remaining_batches() {
    let exec = ScriptedExecutor::new(|i, request| match i {
        1 => Err(validation_failure("Contact name already exists")),
        _ => Ok(echo(request)),
    });
    let client = Client::new(exec.clone());
    let body = numbered_contacts(450);

    let err = client.post("/Contacts", &body, None).await.unwrap_err();

    match err {
        Error::PartialBatchFailure {
            completed,
            total,
            failed,
            source,
        } => {
            assert_eq!(completed, 1);
            assert_eq!(total, 3);
            assert_eq!(failed.batch_no, 2);
            assert_eq!(failed.batch_count, 3);
            assert!(matches!(*source, Error::Service { status: Some(400), .. }));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(exec.requests().len(), 2);
}

#[tokio::test]
async fn failure_on_first_batch_reports_nothing_committed() {
    let exec = ScriptedExecutor::new(|_, _| {
        Err(TransportError::Status {
            status: 503,
            body: "Service Unavailable".to_string(),
        })
    });
    let client = Client::new(exec.clone());

    let err = client
        .post("/Contacts", &numbered_contacts(201), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::PartialBatchFailure {
            completed: 0,
            total: 2,
            ..
        }
    ));
    assert_eq!(exec.requests().len(), 1);
}

#[tokio::test]
async fn empty_body_sends_empty_collection() {
    let exec =
        ScriptedExecutor::new(|_, _| Ok(json!({"Status": "OK", "Contacts": []}).to_string()));
    let client = Client::new(exec.clone());

    let response = client
        .post::<Value>("/Contacts", &[], None)
        .await
        .unwrap();

    assert!(matches!(response, Response::Payload(Payload::Json(_))));
    let requests = exec.requests();
    assert_eq!(requests.len(), 1);
    let body = String::from_utf8(requests[0].body.clone().unwrap()).unwrap();
    assert!(body.ends_with("<Contacts/>"));
}

#[tokio::test]
async fn delete_without_body_is_a_single_request() {
    let exec = ScriptedExecutor::new(|_, _| Ok(json!({"Status": "OK"}).to_string()));
    let client = Client::new(exec.clone());

    let response = client.delete("/Contacts/abc/Attachments", None).await.unwrap();

    assert!(matches!(response, Response::Payload(Payload::Json(_))));
    let requests = exec.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::Delete);
    assert!(requests[0].body.is_none());
}

#[tokio::test]
async fn raw_body_is_sent_as_is_in_one_request() {
    let exec = ScriptedExecutor::new(|_, _| Ok(json!({"Status": "OK"}).to_string()));
    let client = Client::new(exec.clone());
    // Far beyond the size threshold once inflated; raw bodies are never split.
    let upload = vec![0x25u8; 2_000_000];

    let response = client
        .send_raw(
            Method::Put,
            "/Invoices/INV-001/Attachments/scan.png",
            upload.clone(),
            None,
            None,
        )
        .await
        .unwrap();

    assert!(matches!(response, Response::Payload(Payload::Json(_))));
    let requests = exec.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::Put);
    assert_eq!(requests[0].body.as_deref(), Some(upload.as_slice()));
    assert!(requests[0].content_type.is_none());
}

#[tokio::test]
async fn raw_body_keeps_caller_content_type() {
    let exec = ScriptedExecutor::new(|_, _| Ok(String::new()));
    let client = Client::new(exec.clone());

    client
        .send_raw(
            Method::Post,
            "/Receipts/abc/Attachments/r.jpg",
            vec![0xff, 0xd8, 0xff],
            Some("image/jpeg"),
            None,
        )
        .await
        .unwrap();

    let requests = exec.requests();
    assert_eq!(requests[0].content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(query(&requests[0], "summarizeErrors").as_deref(), Some("false"));
}

#[tokio::test]
async fn get_ignores_body() {
    let exec = ScriptedExecutor::new(|i, _| Ok(contact_page(i + 1, 0)));
    let client = Client::new(exec.clone());

    let body = numbered_contacts(5);
    client
        .call(Method::Get, "/Contacts", Some(body.as_slice()), None)
        .await
        .unwrap();

    assert!(exec.requests().iter().all(|r| r.body.is_none()));
}

#[tokio::test]
async fn invalid_path_is_rejected_before_sending() {
    let exec = ScriptedExecutor::new(|_, _| Ok(String::new()));
    let client = Client::new(exec.clone());

    let err = client.get("/", None).await.unwrap_err();

    assert!(matches!(err, Error::InvalidPath(_)));
    assert!(exec.requests().is_empty());
}

#[tokio::test]
async fn concurrent_calls_on_clones_are_independent() {
    let exec = ScriptedExecutor::new(|_, request| {
        let page: usize = query(request, "page")
            .and_then(|p| p.parse().ok())
            .unwrap_or(1);
        Ok(contact_page(page, if page == 1 { 2 } else { 0 }))
    });
    let client = Client::new(exec.clone());
    let other = client.clone();

    let (a, b) = tokio::join!(client.get("/Contacts", None), other.get("/Contacts", None));

    assert_eq!(records(a.unwrap()).len(), 2);
    assert_eq!(records(b.unwrap()).len(), 2);
    assert_eq!(exec.requests().len(), 4);
}
