use ocibind::*;

#[test]
fn check_client_version() -> Result<()> {
    match ocibind::client_version() {
        Ok(client_version) => {
            assert!(client_version.0 >= 11, "unexpected client version {:?}", client_version);
            println!("client version = {:?}", client_version);
        }
        Err(err) => {
            // no client library on this machine
            assert_eq!(err.code(), INTERFACE_ERROR_CODE);
            assert!(err.message().starts_with("Cannot load the OCI client library"));
        }
    }
    Ok(())
}
