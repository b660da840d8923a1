use std::{convert::Infallible, net::SocketAddr, path::Path};

use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use async_graphql_warp::{GraphQLBadRequest, GraphQLResponse};
use tracing::info;
use warp::{http::StatusCode, Filter, Rejection, Reply};

use crate::api::Schema;

/// Runs the GraphQL server. TLS is used when both a certificate and a key
/// are given.
pub(crate) async fn serve(schema: Schema, addr: SocketAddr, tls: Option<(&Path, &Path)>) {
    let routes = routes(schema);
    match tls {
        Some((cert, key)) => {
            info!("Serving GraphQL on https://{addr}");
            warp::serve(routes)
                .tls()
                .cert_path(cert)
                .key_path(key)
                .run(addr)
                .await;
        }
        None => {
            info!("Serving GraphQL on http://{addr}");
            warp::serve(routes).run(addr).await;
        }
    }
}

/// Queries at `/graphql`, the playground at `/`.
fn routes(schema: Schema) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let graphql = warp::path("graphql")
        .and(warp::path::end())
        .and(async_graphql_warp::graphql(schema))
        .and_then(
            |(schema, request): (Schema, async_graphql::Request)| async move {
                Ok::<_, Infallible>(GraphQLResponse::from(schema.execute(request).await))
            },
        );
    let playground = warp::path::end().and(warp::get()).map(|| {
        warp::reply::html(playground_source(GraphQLPlaygroundConfig::new("/graphql")))
    });
    playground.or(graphql).recover(recover)
}

async fn recover(err: Rejection) -> Result<impl Reply, Infallible> {
    if let Some(GraphQLBadRequest(err)) = err.find() {
        return Ok(warp::reply::with_status(
            err.to_string(),
            StatusCode::BAD_REQUEST,
        ));
    }
    if err.is_not_found() {
        return Ok(warp::reply::with_status(
            "not found".to_string(),
            StatusCode::NOT_FOUND,
        ));
    }
    Ok(warp::reply::with_status(
        "internal server error".to_string(),
        StatusCode::INTERNAL_SERVER_ERROR,
    ))
}
