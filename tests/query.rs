//! URI query, walk and batching tests against the mock engine.

mod common;

use common::*;
use snmp_sync_bridge::query::{
    MAX_URI_COUNT, QueryParams, QueryResults, bulk_walk, get_many, query, query_bulk, query_into,
    walk,
};
use snmp_sync_bridge::{Error, Oid, PduType, Response, SendError, Value, VarBind, Version, oid};
use std::time::Duration;

const URI_BASE: &str = "snmp://public@192.0.2.1:161//";

fn uri(path: &str) -> String {
    format!("{URI_BASE}{path}")
}

#[tokio::test]
async fn test_query_get_orders_results() {
    let (bridge, mock) = setup();
    mock.queue_response(Response::ok(vec![sys_name_vb(), sys_descr_vb()]));

    let params = QueryParams::new(uri("(1.3.6.1.2.1.1.5.0,1.3.6.1.2.1.1.1.0)"));
    let results = query(&bridge, &params).await.unwrap();

    let oids: Vec<&Oid> = results.iter().map(|(oid, _)| oid).collect();
    assert_eq!(oids, [&sys_descr(), &sys_name()]);
    assert_eq!(
        results.to_string(),
        format!("1.3.6.1.2.1.1.1.0 = {SYS_DESCR}\n1.3.6.1.2.1.1.5.0 = {SYS_NAME}\n")
    );

    let request = &mock.requests()[0];
    assert_eq!(request.pdu_type, PduType::GetRequest);
    assert_eq!(request.peer, agent_addr());
    assert_eq!(request.varbinds.len(), 2);
}

#[tokio::test]
async fn test_query_uses_params_for_session() {
    let (bridge, mock) = setup();
    mock.queue_response(Response::ok(vec![sys_descr_vb()]));

    let params = QueryParams::new("snmp://private@192.0.2.7:1161//1.3.6.1.2.1.1.1.0")
        .version(Version::V1)
        .timeout(Duration::from_millis(50))
        .retries(1);
    query(&bridge, &params).await.unwrap();

    let request = &mock.requests()[0];
    assert_eq!(request.peer, "192.0.2.7:1161".parse().unwrap());
    assert_eq!(&request.community[..], COMMUNITY_RW);
}

#[tokio::test]
async fn test_query_without_userinfo_uses_public_community() {
    let (bridge, mock) = setup();
    mock.queue_response(Response::ok(vec![sys_descr_vb()]));

    query(&bridge, &QueryParams::new("snmp://192.0.2.1//1.3.6.1.2.1.1.1.0"))
        .await
        .unwrap();

    assert_eq!(&mock.requests()[0].community[..], COMMUNITY_RO);
}

#[tokio::test]
async fn test_query_next_suffix() {
    let (bridge, mock) = setup();
    mock.queue_response(Response::ok(vec![sys_descr_vb()]));

    let params = QueryParams::new(uri("1.3.6.1.2.1.1+"));
    let results = query(&bridge, &params).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(mock.requests()[0].pdu_type, PduType::GetNextRequest);
    assert_eq!(mock.requests()[0].varbinds[0].oid, system_subtree());
}

#[tokio::test]
async fn test_query_keeps_varbinds_from_error_response() {
    let (bridge, mock) = setup();
    mock.queue_response(Response::error(
        2,
        2,
        vec![
            sys_descr_vb(),
            VarBind::new(nonexistent_oid(), Value::Null),
        ],
    ));

    let params = QueryParams::new(uri("(1.3.6.1.2.1.1.1.0,1.3.6.1.99.99.99.0)"));
    let results = query(&bridge, &params).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results.get(&nonexistent_oid()), Some(&Value::Null));
}

#[tokio::test(start_paused = true)]
async fn test_query_returns_timeout() {
    let (bridge, mock) = setup();
    mock.queue_timeout();

    let params = QueryParams::new(uri("1.3.6.1.2.1.1.1.0"));
    let err = query(&bridge, &params).await.unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_query_returns_send_error() {
    let (bridge, mock) = setup();
    mock.queue_reject(SendError::transport("no route"));

    let params = QueryParams::new(uri("1.3.6.1.2.1.1.1.0"));
    let err = query(&bridge, &params).await.unwrap_err();
    assert!(matches!(err, Error::Send { .. }));
}

#[tokio::test]
async fn test_query_rejects_bad_uri_without_sending() {
    let (bridge, mock) = setup();

    let err = query(&bridge, &QueryParams::new("snmp://192.0.2.1")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidUri { .. }));

    let oids: Vec<String> = (0..=MAX_URI_COUNT).map(|i| format!("1.3.6.1.{i}")).collect();
    let params = QueryParams::new(uri(&format!("({})", oids.join(","))));
    let err = query(&bridge, &params).await.unwrap_err();
    assert!(matches!(err, Error::TooManyOids { count: 51, max: 50 }));

    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn test_query_into_merges_results() {
    let (bridge, mock) = setup();
    mock.queue_response(Response::ok(vec![sys_descr_vb()]));
    mock.queue_response(Response::ok(vec![sys_name_vb()]));

    let mut results = QueryResults::new();
    query_into(&bridge, &QueryParams::new(uri("1.3.6.1.2.1.1.1.0")), &mut results)
        .await
        .unwrap();
    query_into(&bridge, &QueryParams::new(uri("1.3.6.1.2.1.1.5.0")), &mut results)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.get(&sys_descr()).is_some());
    assert!(results.get(&sys_name()).is_some());
}

#[tokio::test]
async fn test_v1_walk_uses_getnext_until_subtree_ends() {
    let (bridge, mock) = setup();
    mock.queue_response(Response::ok(vec![sys_descr_vb()]));
    mock.queue_response(Response::ok(vec![sys_uptime_vb(100)]));
    mock.queue_response(Response::ok(vec![VarBind::new(if_number(), Value::Integer(4))]));

    let params = QueryParams::new(uri("1.3.6.1.2.1.1*")).version(Version::V1);
    let results = query(&bridge, &params).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results.get(&sys_uptime()), Some(&Value::TimeTicks(100)));
    assert!(!results.iter().any(|(oid, _)| oid.starts_with(&interfaces_subtree())));

    let requests = mock.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r.pdu_type == PduType::GetNextRequest));
    assert_eq!(requests[1].varbinds[0].oid, sys_descr());
    assert_eq!(requests[2].varbinds[0].oid, sys_uptime());
}

#[tokio::test]
async fn test_walk_stops_on_no_such_name() {
    let (bridge, mock) = setup();
    let s = session();
    mock.queue_response(Response::ok(vec![sys_descr_vb()]));
    mock.queue_response(Response::error(2, 1, vec![VarBind::null(sys_descr())]));

    let subtree = walk(&bridge, &s, &system_subtree()).await.unwrap();
    assert_eq!(subtree.len(), 1);
    assert!(!s.is_busy());
}

#[tokio::test]
async fn test_walk_stops_on_end_of_mib_view() {
    let (bridge, mock) = setup();
    let s = session();
    mock.queue_response(Response::ok(vec![sys_descr_vb()]));
    mock.queue_response(Response::ok(vec![VarBind::new(
        sys_descr(),
        Value::EndOfMibView,
    )]));

    let subtree = walk(&bridge, &s, &system_subtree()).await.unwrap();
    assert_eq!(subtree, vec![sys_descr_vb()]);
}

#[tokio::test]
async fn test_walk_errors_on_non_increasing_oid() {
    let (bridge, mock) = setup();
    let s = session();
    mock.queue_response(Response::ok(vec![sys_name_vb()]));
    mock.queue_response(Response::ok(vec![sys_descr_vb()]));

    let err = walk(&bridge, &s, &system_subtree()).await.unwrap_err();
    match err {
        Error::NonIncreasingOid { previous, current } => {
            assert_eq!(previous, sys_name());
            assert_eq!(current, sys_descr());
        }
        other => panic!("expected NonIncreasingOid, got {other:?}"),
    }
}

#[tokio::test]
async fn test_v2c_walk_uses_getbulk() {
    let (bridge, mock) = setup();
    mock.queue_response(Response::ok(vec![sys_descr_vb(), sys_uptime_vb(7)]));
    mock.queue_response(Response::ok(vec![
        sys_name_vb(),
        VarBind::new(if_number(), Value::Integer(4)),
    ]));

    let params = QueryParams::new(uri("1.3.6.1.2.1.1*")).max_repetitions(2);
    let results = query(&bridge, &params).await.unwrap();

    assert_eq!(results.len(), 3);
    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].pdu_type, PduType::GetBulkRequest);
    assert_eq!(requests[0].args.arg1, 0);
    assert_eq!(requests[0].args.arg2, 2);
    assert_eq!(requests[1].varbinds[0].oid, sys_uptime());
}

#[tokio::test]
async fn test_bulk_walk_stops_on_empty_page() {
    let (bridge, mock) = setup();
    let s = session();
    mock.queue_response(Response::ok(vec![sys_descr_vb()]));
    mock.queue_response(Response::ok(Vec::new()));

    let subtree = bulk_walk(&bridge, &s, &system_subtree(), 10).await.unwrap();
    assert_eq!(subtree.len(), 1);
    assert_eq!(mock.request_count(), 2);
}

#[tokio::test]
async fn test_query_bulk_forwards_bulk_settings() {
    let (bridge, mock) = setup();
    mock.queue_response(Response::ok(vec![sys_descr_vb(), sys_name_vb()]));

    let params = QueryParams::new(uri("(1.3.6.1.2.1.1.1,1.3.6.1.2.1.1.5)"));
    let results = query_bulk(&bridge, &params).await.unwrap();

    assert_eq!(results.len(), 2);
    let request = &mock.requests()[0];
    assert_eq!(request.pdu_type, PduType::GetBulkRequest);
    assert_eq!((request.args.arg1, request.args.arg2), (1, 100));
}

#[tokio::test]
async fn test_get_many_batches_requests() {
    let (bridge, mock) = setup();
    let s = session();
    let oids: Vec<Oid> = (0..120u32).map(|i| oid!(1, 3, 6, 1, 4, 1, 9999, i)).collect();

    for chunk in oids.chunks(MAX_URI_COUNT) {
        let varbinds: Vec<VarBind> = chunk
            .iter()
            .map(|oid| VarBind::new(oid.clone(), Value::Integer(1)))
            .collect();
        mock.queue_response(Response::ok(varbinds));
    }

    let results = get_many(&bridge, &s, &oids).await.unwrap();
    assert_eq!(results.len(), 120);

    let sizes: Vec<usize> = mock.requests().iter().map(|r| r.varbinds.len()).collect();
    assert_eq!(sizes, [50, 50, 20]);
}

#[tokio::test]
async fn test_get_many_of_nothing_sends_nothing() {
    let (bridge, mock) = setup();
    let results = get_many(&bridge, &session(), &[]).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(mock.request_count(), 0);
}
