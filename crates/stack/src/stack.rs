//! # リソース宣言
//!
//! ```text
//! RestApi (REGIONAL)
//!   └─ /transaction
//!        ├─ POST    → AWS_PROXY → Lambda (provided.al2023, bootstrap)
//!        └─ OPTIONS → MOCK (CORSプリフライト)
//! Deployment → Stage "prod"
//! Lambda::Permission (apigateway.amazonaws.com)
//! ```

use serde_json::{json, Value};

use crate::props::StackProps;
use crate::template::{get_att, reference, sub, tag_list, Export, Output, Parameter, Resource, Template};
use crate::StackError;

// ---------------------------------------------------------------------------
// 論理ID
// ---------------------------------------------------------------------------

pub const CODE_BUCKET_PARAM: &str = "CodeS3Bucket";
pub const CODE_KEY_PARAM: &str = "CodeS3Key";
pub const SIGNER_PRIVATE_KEY_PARAM: &str = "SignerPrivateKey";
pub const RECIPIENT_ADDRESS_PARAM: &str = "RecipientAddress";
pub const NODE_URL_PARAM: &str = "NodeUrl";
pub const NETWORK_PARAM: &str = "SymbolNetwork";
pub const FEE_MULTIPLIER_PARAM: &str = "FeeMultiplier";
pub const TRANSFER_AMOUNT_PARAM: &str = "TransferAmount";
pub const MOSAIC_ID_PARAM: &str = "MosaicId";

pub const FUNCTION_ROLE: &str = "SymbolTransactionFunctionRole";
pub const FUNCTION: &str = "SymbolTransactionFunction";
pub const API: &str = "SymbolTransactionApi";
pub const API_CLOUDWATCH_ROLE: &str = "SymbolTransactionApiCloudWatchRole";
pub const API_ACCOUNT: &str = "SymbolTransactionApiAccount";
pub const TRANSACTION_RESOURCE: &str = "SymbolTransactionApiTransaction";
pub const TRANSACTION_POST: &str = "SymbolTransactionApiTransactionPOST";
pub const TRANSACTION_OPTIONS: &str = "SymbolTransactionApiTransactionOPTIONS";
pub const DEPLOYMENT: &str = "SymbolTransactionApiDeployment";
pub const STAGE: &str = "SymbolTransactionApiStageprod";
pub const INVOKE_PERMISSION: &str = "SymbolTransactionFunctionApiGatewayInvoke";
pub const API_ENDPOINT_OUTPUT: &str = "ApiEndpoint";

/// `ApiEndpoint` のエクスポート名
pub const API_ENDPOINT_EXPORT: &str = "SymbolTransactionApiEndpoint";
/// REST API名
pub const API_NAME: &str = "Symbol Transaction API";
/// ステージ名
pub const STAGE_NAME: &str = "prod";
/// リソースパス
pub const TRANSACTION_PATH: &str = "transaction";

/// デフォルトのアナウンス先ノード
const DEFAULT_NODE_URL: &str = "http://sym-test-03.opening-line.jp:3000";

/// CORSで許可するヘッダ
pub const CORS_ALLOW_HEADERS: &[&str] = &[
    "Content-Type",
    "X-Amz-Date",
    "Authorization",
    "X-Api-Key",
    "Idempotency-Key",
];
/// CORSで許可するメソッド
pub const CORS_ALLOW_METHODS: &str = "OPTIONS,GET,PUT,POST,DELETE,PATCH,HEAD";

/// スタックのテンプレートを組み立てる。
pub fn build_template(props: &StackProps) -> Result<Template, StackError> {
    props.validate()?;

    let mut template = Template::new(&props.description);
    add_parameters(&mut template)?;
    add_function(&mut template, props)?;
    add_rest_api(&mut template, props)?;
    add_output(&mut template)?;

    template.validate_references()?;
    Ok(template)
}

fn add_parameters(template: &mut Template) -> Result<(), StackError> {
    template.add_parameter(
        CODE_BUCKET_PARAM,
        Parameter::string("S3 bucket holding the bootstrap zip"),
    )?;
    template.add_parameter(
        CODE_KEY_PARAM,
        Parameter::string("S3 key of the bootstrap zip"),
    )?;
    template.add_parameter(
        SIGNER_PRIVATE_KEY_PARAM,
        Parameter::string("Hex-encoded Ed25519 private key of the signer").secret(),
    )?;
    template.add_parameter(
        RECIPIENT_ADDRESS_PARAM,
        Parameter::string("Base32 address receiving the transfer"),
    )?;
    template.add_parameter(
        NODE_URL_PARAM,
        Parameter::string("Symbol node the transaction is announced to").with_default(DEFAULT_NODE_URL),
    )?;
    template.add_parameter(
        NETWORK_PARAM,
        Parameter::string("Symbol network")
            .with_default("testnet")
            .with_allowed_values(&["testnet", "mainnet"]),
    )?;
    template.add_parameter(
        FEE_MULTIPLIER_PARAM,
        Parameter::string("Fee multiplier (fee = size x multiplier)").with_default("100"),
    )?;
    template.add_parameter(
        TRANSFER_AMOUNT_PARAM,
        Parameter::string("Amount to transfer in atomic units").with_default("1000000"),
    )?;
    template.add_parameter(
        MOSAIC_ID_PARAM,
        Parameter::string("Hex mosaic id (empty for the network currency)").with_default(""),
    )?;
    Ok(())
}

/// 実行ロールとLambda関数。
fn add_function(template: &mut Template, props: &StackProps) -> Result<(), StackError> {
    let tags = tag_list(&props.tags);
    let function = &props.function;

    template.add_resource(
        FUNCTION_ROLE,
        Resource::new(
            "AWS::IAM::Role",
            json!({
                "AssumeRolePolicyDocument": assume_role_policy("lambda.amazonaws.com"),
                "ManagedPolicyArns": [
                    sub("arn:${AWS::Partition}:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole")
                ],
                "Tags": tags,
            }),
        ),
    )?;

    template.add_resource(
        FUNCTION,
        Resource::new(
            "AWS::Lambda::Function",
            json!({
                "Runtime": function.runtime,
                "Handler": function.handler,
                "Code": {
                    "S3Bucket": reference(CODE_BUCKET_PARAM),
                    "S3Key": reference(CODE_KEY_PARAM),
                },
                "Role": get_att(FUNCTION_ROLE, "Arn"),
                "Timeout": function.timeout_secs,
                "MemorySize": function.memory_mb,
                "Environment": {
                    "Variables": {
                        "NODE_URL": reference(NODE_URL_PARAM),
                        "SYMBOL_NETWORK": reference(NETWORK_PARAM),
                        "SIGNER_PRIVATE_KEY": reference(SIGNER_PRIVATE_KEY_PARAM),
                        "RECIPIENT_ADDRESS": reference(RECIPIENT_ADDRESS_PARAM),
                        "FEE_MULTIPLIER": reference(FEE_MULTIPLIER_PARAM),
                        "TRANSFER_AMOUNT": reference(TRANSFER_AMOUNT_PARAM),
                        "MOSAIC_ID": reference(MOSAIC_ID_PARAM),
                        "RUST_LOG": function.log_filter,
                    }
                },
                "Tags": tags,
            }),
        )
        .depends_on(&[FUNCTION_ROLE]),
    )?;

    template.add_resource(
        INVOKE_PERMISSION,
        Resource::new(
            "AWS::Lambda::Permission",
            json!({
                "Action": "lambda:InvokeFunction",
                "FunctionName": get_att(FUNCTION, "Arn"),
                "Principal": "apigateway.amazonaws.com",
                "SourceArn": sub(&format!(
                    "arn:${{AWS::Partition}}:execute-api:${{AWS::Region}}:${{AWS::AccountId}}:${{{API}}}/*/*/*"
                )),
            }),
        ),
    )?;

    Ok(())
}

/// REST API・リソース・メソッド・デプロイメント・ステージ。
fn add_rest_api(template: &mut Template, props: &StackProps) -> Result<(), StackError> {
    let tags = tag_list(&props.tags);
    let function = &props.function;

    template.add_resource(
        API,
        Resource::new(
            "AWS::ApiGateway::RestApi",
            json!({
                "Name": API_NAME,
                "Description": "API for Symbol blockchain transactions",
                "EndpointConfiguration": { "Types": ["REGIONAL"] },
                "Tags": tags,
            }),
        ),
    )?;

    // ステージのログ出力にはアカウント単位のCloudWatchロールが必要
    template.add_resource(
        API_CLOUDWATCH_ROLE,
        Resource::new(
            "AWS::IAM::Role",
            json!({
                "AssumeRolePolicyDocument": assume_role_policy("apigateway.amazonaws.com"),
                "ManagedPolicyArns": [
                    sub("arn:${AWS::Partition}:iam::aws:policy/service-role/AmazonAPIGatewayPushToCloudWatchLogs")
                ],
                "Tags": tags,
            }),
        ),
    )?;
    template.add_resource(
        API_ACCOUNT,
        Resource::new(
            "AWS::ApiGateway::Account",
            json!({ "CloudWatchRoleArn": get_att(API_CLOUDWATCH_ROLE, "Arn") }),
        )
        .depends_on(&[API]),
    )?;

    template.add_resource(
        TRANSACTION_RESOURCE,
        Resource::new(
            "AWS::ApiGateway::Resource",
            json!({
                "ParentId": get_att(API, "RootResourceId"),
                "PathPart": TRANSACTION_PATH,
                "RestApiId": reference(API),
            }),
        ),
    )?;

    template.add_resource(
        TRANSACTION_POST,
        Resource::new(
            "AWS::ApiGateway::Method",
            json!({
                "HttpMethod": "POST",
                "ResourceId": reference(TRANSACTION_RESOURCE),
                "RestApiId": reference(API),
                "AuthorizationType": "NONE",
                "ApiKeyRequired": false,
                "Integration": {
                    "Type": "AWS_PROXY",
                    "IntegrationHttpMethod": "POST",
                    "Uri": sub(&format!(
                        "arn:${{AWS::Partition}}:apigateway:${{AWS::Region}}:lambda:path/2015-03-31/functions/${{{FUNCTION}.Arn}}/invocations"
                    )),
                    "TimeoutInMillis": function.integration_timeout_ms,
                },
                "MethodResponses": [
                    {
                        "StatusCode": "200",
                        "ResponseModels": { "application/json": "Empty" },
                    }
                ],
            }),
        ),
    )?;

    template.add_resource(
        TRANSACTION_OPTIONS,
        Resource::new(
            "AWS::ApiGateway::Method",
            json!({
                "HttpMethod": "OPTIONS",
                "ResourceId": reference(TRANSACTION_RESOURCE),
                "RestApiId": reference(API),
                "AuthorizationType": "NONE",
                "ApiKeyRequired": false,
                "Integration": {
                    "Type": "MOCK",
                    "RequestTemplates": { "application/json": "{ statusCode: 200 }" },
                    "IntegrationResponses": [
                        {
                            "StatusCode": "204",
                            "ResponseParameters": cors_response_parameters(),
                        }
                    ],
                },
                "MethodResponses": [
                    {
                        "StatusCode": "204",
                        "ResponseParameters": cors_method_response_parameters(),
                    }
                ],
            }),
        ),
    )?;

    template.add_resource(
        DEPLOYMENT,
        Resource::new(
            "AWS::ApiGateway::Deployment",
            json!({
                "RestApiId": reference(API),
                "Description": "Symbol Transaction API deployment",
            }),
        )
        .depends_on(&[TRANSACTION_POST, TRANSACTION_OPTIONS]),
    )?;

    template.add_resource(
        STAGE,
        Resource::new(
            "AWS::ApiGateway::Stage",
            json!({
                "RestApiId": reference(API),
                "DeploymentId": reference(DEPLOYMENT),
                "StageName": STAGE_NAME,
                "Description": "Production stage",
                "TracingEnabled": true,
                "MethodSettings": [
                    {
                        "ResourcePath": "/*",
                        "HttpMethod": "*",
                        "DataTraceEnabled": true,
                        "MetricsEnabled": true,
                        "LoggingLevel": "INFO",
                    }
                ],
                "Tags": tags,
            }),
        )
        .depends_on(&[API_ACCOUNT]),
    )?;

    Ok(())
}

fn add_output(template: &mut Template) -> Result<(), StackError> {
    template.add_output(
        API_ENDPOINT_OUTPUT,
        Output {
            description: Some("API Gateway endpoint URL for the transaction endpoint".to_string()),
            value: sub(&format!(
                "https://${{{API}}}.execute-api.${{AWS::Region}}.${{AWS::URLSuffix}}/${{{STAGE}}}/{TRANSACTION_PATH}"
            )),
            export: Some(Export {
                name: API_ENDPOINT_EXPORT.to_string(),
            }),
        },
    )
}

fn assume_role_policy(service: &str) -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Principal": { "Service": service },
                "Action": "sts:AssumeRole",
            }
        ],
    })
}

/// MOCK統合が返すCORSヘッダ（値はシングルクォートで囲んだリテラル）。
fn cors_response_parameters() -> Value {
    json!({
        "method.response.header.Access-Control-Allow-Headers": format!("'{}'", CORS_ALLOW_HEADERS.join(",")),
        "method.response.header.Access-Control-Allow-Origin": "'*'",
        "method.response.header.Access-Control-Allow-Methods": format!("'{CORS_ALLOW_METHODS}'"),
    })
}

fn cors_method_response_parameters() -> Value {
    json!({
        "method.response.header.Access-Control-Allow-Headers": true,
        "method.response.header.Access-Control-Allow-Origin": true,
        "method.response.header.Access-Control-Allow-Methods": true,
    })
}
