//! Declarative description of the managed resources the pipeline runs on.
//!
//! Nothing here talks to a cloud API. The manifest is printed by the
//! `resources` command and consumed by whatever provisions the environment.

use serde::Serialize;
use std::collections::BTreeMap;

/// Routes served by the API function, as `(method, path)`.
pub const API_ROUTES: [(&str, &str); 4] = [
    ("POST", "/process"),
    ("GET", "/status/{job_id}"),
    ("GET", "/results"),
    ("GET", "/health"),
];

pub const CATALOG_DATABASE: &str = "data_pipeline_db";
pub const CRAWLER_NAME: &str = "data-pipeline-crawler";
pub const CRAWLER_SCHEDULE: &str = "cron(0 2 * * ? *)";
pub const WORKGROUP_NAME: &str = "data-pipeline-workgroup";
pub const EXTRACTION_SCHEDULE: &str = "rate(1 hour)";
pub const FUNCTION_TIMEOUT_SECS: u64 = 300;

const CORS_ALLOW_HEADERS: [&str; 5] = [
    "Content-Type",
    "X-Amz-Date",
    "Authorization",
    "X-Api-Key",
    "X-Amz-Security-Token",
];

#[derive(Debug, Clone, Serialize)]
pub struct Bucket {
    pub logical_id: &'static str,
    pub name: String,
    pub versioned: bool,
    pub auto_delete_objects: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobsTable {
    pub logical_id: &'static str,
    pub name: String,
    pub partition_key: &'static str,
    pub billing_mode: &'static str,
}

impl JobsTable {
    /// Placeholder the provisioner replaces with the table's connection string.
    pub fn connection_ref(&self) -> String {
        format!("${{{}.ConnectionUrl}}", self.logical_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Function {
    pub logical_id: &'static str,
    /// Command line run by the function runtime
    pub command: Vec<&'static str>,
    pub role: &'static str,
    pub timeout_secs: u64,
    pub environment: BTreeMap<&'static str, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleRule {
    pub logical_id: &'static str,
    pub expression: &'static str,
    pub target: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Route {
    pub method: &'static str,
    pub path: &'static str,
    pub integration: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Cors {
    pub allow_origins: Vec<&'static str>,
    pub allow_methods: Vec<&'static str>,
    pub allow_headers: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestApi {
    pub logical_id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub cors: Cors,
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogDatabase {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Crawler {
    pub name: &'static str,
    pub role: &'static str,
    pub database: &'static str,
    pub targets: Vec<String>,
    pub schedule: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Workgroup {
    pub name: &'static str,
    pub output_location: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Read,
    ReadWrite,
}

#[derive(Debug, Clone, Serialize)]
pub struct Grant {
    pub resource: &'static str,
    pub access: Access,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyStatement {
    pub effect: &'static str,
    pub actions: Vec<&'static str>,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Role {
    pub logical_id: &'static str,
    pub assumed_by: &'static str,
    pub managed_policies: Vec<&'static str>,
    pub grants: Vec<Grant>,
    pub statements: Vec<PolicyStatement>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Output {
    pub key: &'static str,
    pub value: String,
    pub description: &'static str,
}

/// Full resource manifest for one account/region.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResources {
    pub account: String,
    pub region: String,
    pub data_bucket: Bucket,
    pub query_results_bucket: Bucket,
    pub jobs_table: JobsTable,
    pub functions: Vec<Function>,
    pub schedule: ScheduleRule,
    pub api: RestApi,
    pub catalog_database: CatalogDatabase,
    pub crawler: Crawler,
    pub workgroup: Workgroup,
    pub roles: Vec<Role>,
    pub outputs: Vec<Output>,
}

impl PipelineResources {
    pub fn for_environment(account: &str, region: &str) -> Self {
        let data_bucket = Bucket {
            logical_id: "DataBucket",
            name: format!("data-pipeline-bucket-{account}-{region}"),
            versioned: true,
            auto_delete_objects: true,
        };
        let query_results_bucket = Bucket {
            logical_id: "AthenaResultsBucket",
            name: format!("athena-results-bucket-{account}-{region}"),
            versioned: false,
            auto_delete_objects: true,
        };
        let jobs_table = JobsTable {
            logical_id: "JobsTable",
            name: format!("data-pipeline-jobs-{account}"),
            partition_key: "job_id",
            billing_mode: "PAY_PER_REQUEST",
        };

        let functions = vec![
            Function {
                logical_id: "DataExtractorFunction",
                command: vec!["data-pipeline", "extract"],
                role: "FunctionExecutionRole",
                timeout_secs: FUNCTION_TIMEOUT_SECS,
                environment: BTreeMap::from([
                    ("BUCKET_NAME", data_bucket.name.clone()),
                    ("API_URL", crate::config::DEFAULT_API_URL.to_string()),
                ]),
            },
            Function {
                logical_id: "ApiFunction",
                command: vec!["data-pipeline", "serve"],
                role: "FunctionExecutionRole",
                timeout_secs: FUNCTION_TIMEOUT_SECS,
                environment: BTreeMap::from([
                    ("BUCKET_NAME", data_bucket.name.clone()),
                    ("DATABASE_URL", jobs_table.connection_ref()),
                    // extraction is driven by the schedule rule, not the API process
                    ("EXTRACT_INTERVAL_SECS", "0".to_string()),
                ]),
            },
        ];

        let api = RestApi {
            logical_id: "DataPipelineApi",
            name: "Data Pipeline API",
            description: "REST API for testing the data pipeline",
            cors: Cors {
                allow_origins: vec!["*"],
                allow_methods: vec!["*"],
                allow_headers: CORS_ALLOW_HEADERS.to_vec(),
            },
            routes: API_ROUTES
                .iter()
                .map(|&(method, path)| Route {
                    method,
                    path,
                    integration: "ApiFunction",
                })
                .collect(),
        };

        let crawler = Crawler {
            name: CRAWLER_NAME,
            role: "CatalogCrawlerRole",
            database: CATALOG_DATABASE,
            targets: vec![format!("s3://{}/data/", data_bucket.name)],
            schedule: CRAWLER_SCHEDULE,
        };

        let workgroup = Workgroup {
            name: WORKGROUP_NAME,
            output_location: format!("s3://{}/", query_results_bucket.name),
        };

        let catalog_arn = |suffix: &str| format!("arn:aws:glue:{region}:{account}:{suffix}");
        let roles = vec![
            Role {
                logical_id: "FunctionExecutionRole",
                assumed_by: "lambda.amazonaws.com",
                managed_policies: vec!["service-role/AWSLambdaBasicExecutionRole"],
                grants: vec![
                    Grant {
                        resource: data_bucket.logical_id,
                        access: Access::ReadWrite,
                    },
                    Grant {
                        resource: jobs_table.logical_id,
                        access: Access::ReadWrite,
                    },
                ],
                statements: Vec::new(),
            },
            Role {
                logical_id: "CatalogCrawlerRole",
                assumed_by: "glue.amazonaws.com",
                managed_policies: vec!["service-role/AWSGlueServiceRole"],
                grants: vec![Grant {
                    resource: data_bucket.logical_id,
                    access: Access::Read,
                }],
                statements: vec![PolicyStatement {
                    effect: "Allow",
                    actions: vec![
                        "lakeformation:GetDataAccess",
                        "lakeformation:GrantPermissions",
                        "lakeformation:BatchGrantPermissions",
                        "lakeformation:RevokePermissions",
                        "lakeformation:BatchRevokePermissions",
                        "lakeformation:ListPermissions",
                    ],
                    resources: vec!["*".to_string()],
                }],
            },
            Role {
                logical_id: "QueryExecutionRole",
                assumed_by: "athena.amazonaws.com",
                managed_policies: vec!["AmazonAthenaFullAccess"],
                grants: vec![
                    Grant {
                        resource: data_bucket.logical_id,
                        access: Access::Read,
                    },
                    Grant {
                        resource: query_results_bucket.logical_id,
                        access: Access::ReadWrite,
                    },
                ],
                statements: vec![PolicyStatement {
                    effect: "Allow",
                    actions: vec![
                        "glue:GetDatabase",
                        "glue:GetDatabases",
                        "glue:GetTable",
                        "glue:GetTables",
                        "glue:GetPartition",
                        "glue:GetPartitions",
                        "glue:BatchCreatePartition",
                        "glue:BatchDeletePartition",
                        "glue:BatchUpdatePartition",
                    ],
                    resources: vec![
                        catalog_arn("catalog"),
                        catalog_arn(&format!("database/{CATALOG_DATABASE}")),
                        catalog_arn(&format!("table/{CATALOG_DATABASE}/*")),
                    ],
                }],
            },
        ];

        let outputs = vec![
            Output {
                key: "DataBucketName",
                value: data_bucket.name.clone(),
                description: "Bucket holding raw and derived artifacts",
            },
            Output {
                key: "CatalogDatabaseName",
                value: CATALOG_DATABASE.to_string(),
                description: "Catalog database populated by the crawler",
            },
            Output {
                key: "ExtractorFunctionName",
                value: "DataExtractorFunction".to_string(),
                description: "Scheduled extraction function",
            },
            Output {
                key: "WorkGroupName",
                value: WORKGROUP_NAME.to_string(),
                description: "Query engine workgroup",
            },
            Output {
                key: "JobsTableName",
                value: jobs_table.name.clone(),
                description: "Job tracking table",
            },
        ];

        Self {
            account: account.to_string(),
            region: region.to_string(),
            schedule: ScheduleRule {
                logical_id: "ExtractionScheduleRule",
                expression: EXTRACTION_SCHEDULE,
                target: "DataExtractorFunction",
            },
            data_bucket,
            query_results_bucket,
            jobs_table,
            functions,
            api,
            catalog_database: CatalogDatabase {
                name: CATALOG_DATABASE,
                description: "Database for data pipeline",
            },
            crawler,
            workgroup,
            roles,
            outputs,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
