use juliafarm::worker::protocol::{decode_result_for, Message};
use juliafarm::worker::ProtocolError;
use juliafarm::{JobSpec, RowResult, Task};

fn task(id: u32, columns: u32) -> Task {
    Task {
        id,
        max_iterations: 300,
        rows: 720,
        columns,
    }
}

#[test]
fn test_task_round_trip() {
    let message = Message::Task(JobSpec::default().task(719));
    let line = message.encode();

    assert_eq!(line, "task 719 300 720 1280\n");
    assert_eq!(Message::decode(&line).unwrap(), message);
}

#[test]
fn test_empty_result_round_trip() {
    let message = Message::Result(RowResult {
        task_id: 3,
        values: Vec::new(),
    });
    let line = message.encode();

    assert_eq!(line, "result 3 0\n");
    assert_eq!(Message::decode(&line).unwrap(), message);
    assert!(decode_result_for(&line, &task(3, 0)).unwrap().values.is_empty());
}

#[test]
fn test_full_width_result_round_trip() {
    let values: Vec<u32> = (0..1280).map(|i| i % 301).collect();
    let message = Message::Result(RowResult {
        task_id: 42,
        values: values.clone(),
    });
    let line = message.encode();

    assert!(line.starts_with("result 42 1280 0 1 2 "));
    assert_eq!(line.split_whitespace().count(), 3 + 1280);

    let decoded = decode_result_for(&line, &task(42, 1280)).unwrap();
    assert_eq!(decoded.task_id, 42);
    assert_eq!(decoded.values, values);
}

#[test]
fn test_close_round_trip() {
    assert_eq!(Message::Close.encode(), "close\n");
    assert_eq!(Message::decode("close\r\n").unwrap(), Message::Close);
}

#[test]
fn test_declared_count_must_match_values() {
    let err = Message::decode("result 0 3 1 2").unwrap_err();
    assert_eq!(
        err,
        ProtocolError::ValueCountMismatch {
            declared: 3,
            actual: 2
        }
    );
}

#[test]
fn test_result_for_other_task_is_rejected() {
    let err = decode_result_for("result 5 2 1 1", &task(4, 2)).unwrap_err();
    assert_eq!(
        err,
        ProtocolError::TaskIdMismatch {
            expected: 4,
            actual: 5
        }
    );
}

#[test]
fn test_result_with_wrong_width_is_rejected() {
    let err = decode_result_for("result 4 1 9", &task(4, 2)).unwrap_err();
    assert!(matches!(err, ProtocolError::ColumnCountMismatch { .. }));
}

#[test]
fn test_malformed_lines() {
    assert_eq!(Message::decode("").unwrap_err(), ProtocolError::EmptyLine);
    assert!(matches!(
        Message::decode("hello 1 2").unwrap_err(),
        ProtocolError::UnknownCommand(_)
    ));
    assert!(matches!(
        Message::decode("task 1 2 3").unwrap_err(),
        ProtocolError::MissingField { .. }
    ));
    assert!(matches!(
        Message::decode("task 1 2 3 -4").unwrap_err(),
        ProtocolError::InvalidInteger { .. }
    ));
    assert!(matches!(
        Message::decode("close now").unwrap_err(),
        ProtocolError::TrailingData { .. }
    ));
}
