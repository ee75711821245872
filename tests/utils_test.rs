use euterpe::utils::*;

#[test]
fn test_generate_code_verifier() {
    let verifier = generate_code_verifier();

    // PKCE allows 43 to 128 characters
    assert_eq!(verifier.len(), 128);
    assert!(verifier.chars().all(|c| c.is_ascii_alphanumeric()));

    let verifier2 = generate_code_verifier();
    assert_ne!(verifier, verifier2);
}

#[test]
fn test_generate_code_challenge() {
    let verifier = "test_verifier_123";
    let challenge = generate_code_challenge(verifier);

    assert_eq!(challenge, generate_code_challenge(verifier));
    assert_ne!(challenge, generate_code_challenge("different_verifier"));

    // SHA-256 digest, base64 URL-safe without padding
    assert_eq!(challenge.len(), 43);
    assert!(
        challenge
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    );
}

#[test]
fn test_code_challenge_rfc7636_vector() {
    // Appendix B of RFC 7636
    let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    assert_eq!(
        generate_code_challenge(verifier),
        "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
    );
}

#[test]
fn test_generate_session_id() {
    let id = generate_session_id();
    assert_eq!(id.len(), 48);
    assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_ne!(id, generate_session_id());
}

#[test]
fn test_join_names() {
    assert_eq!(join_names(["Daft Punk"]), "Daft Punk");
    assert_eq!(join_names(["Simon", "Garfunkel"]), "Simon, Garfunkel");
    assert_eq!(join_names(Vec::<&str>::new()), "");
}
