use anyhow::{Context, Result};
use clap::Args;
use tollgate_oidc::{
    Authenticator, ClientId, ClientSecret, Identifier, MemoryStateStore, ProviderConfig,
};
use url::Url;

#[derive(Args)]
pub struct LoginArgs {
    /// Display name for the provider (e.g. "corporate-sso").
    #[arg(long)]
    pub provider: Option<String>,

    #[arg(long, env = "TOLLGATE_CLIENT_ID")]
    pub client_id: String,

    #[arg(long, env = "TOLLGATE_CLIENT_SECRET")]
    pub client_secret: String,

    /// Authorization endpoint URL.
    #[arg(long)]
    pub authorization_endpoint: Url,

    /// Token endpoint URL.
    #[arg(long)]
    pub token_endpoint: Url,

    /// Userinfo endpoint URL.
    #[arg(long)]
    pub userinfo_endpoint: Option<Url>,

    /// Redirect URI registered with the provider (must be https).
    #[arg(long)]
    pub redirect_uri: Url,

    /// Extra scopes on top of `openid`. Repeatable.
    #[arg(long = "scope")]
    pub scopes: Vec<String>,
}

pub async fn run(args: LoginArgs) -> Result<()> {
    let provider = ProviderConfig {
        identifier: args.provider.map(Identifier::new).transpose()?,
        client_id: ClientId::new(args.client_id)?,
        client_secret: ClientSecret::new(args.client_secret)?,
        authorization_endpoint: args.authorization_endpoint,
        token_endpoint: args.token_endpoint,
        user_info_endpoint: args.userinfo_endpoint,
    };

    let authenticator = Authenticator::new(MemoryStateStore::new());

    let request = authenticator
        .begin_authentication(args.redirect_uri, provider)
        .await?
        .with_scopes(args.scopes)?;

    println!("Open this URL in your browser and sign in:\n\n{}\n", request.uri());
    println!("After signing in you will land on the redirect URI.");
    println!("Paste that full callback URL here:");

    let callback = read_callback_url()?;

    let code_response = authenticator
        .handle_authorization_code_callback(&callback)
        .await?;
    println!("Callback validated. Exchanging the authorization code for tokens...");

    let tokens_response = authenticator
        .fetch_tokens_with_authorization_code(&code_response)
        .await?;

    let id_token = &tokens_response.tokens.user_id_token;
    println!(
        "Signed in as {} (issuer {}), token expires at {}.",
        id_token.subject(),
        id_token.issuer(),
        id_token.expires_at()
    );

    if tokens_response.provider.user_info_endpoint.is_some() {
        let info = authenticator.fetch_user_info(&tokens_response).await?;
        let verified = if info.email_verified { "verified" } else { "unverified" };
        println!("{} <{}> ({verified})", info.full_name, info.email);
    }

    Ok(())
}

fn read_callback_url() -> Result<Url> {
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("failed to read callback URL from stdin")?;
    Url::parse(line.trim()).context("pasted callback is not a valid URL")
}
