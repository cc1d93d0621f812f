use http::Request;
use kube::Client;
use tokio::fs;

const NAMESPACE_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

pub async fn get_namespace() -> std::result::Result<String, std::io::Error> {
    let current_namespace = fs::read_to_string(NAMESPACE_PATH).await?.trim().to_string();
    Ok(current_namespace)
}

/// Returns `configured` when set, otherwise the service account's namespace.
pub async fn resolve_namespace(configured: Option<&str>) -> std::result::Result<String, std::io::Error> {
    match configured.map(str::trim).filter(|ns| !ns.is_empty()) {
        Some(namespace) => Ok(namespace.to_string()),
        None => get_namespace().await,
    }
}

pub async fn create_k8s_client() -> std::result::Result<Client, kube::Error> {
    let client = Client::try_default().await?;
    let req = Request::builder()
        .uri("/livez")
        .body(Vec::new())
        .map_err(kube::Error::HttpError)?;
    client.request_text(req).await?;
    Ok(client)
}
