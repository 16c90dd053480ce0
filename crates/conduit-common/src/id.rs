/// Random token identifying one client session to a polling peer.
pub fn new_session_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Short random tag for correlating log lines of one connection.
pub fn new_correlation_id() -> String {
    let mut id = new_session_token();
    id.truncate(8);
    id
}
