//! Static organizational context for DCS Solutions.

use crate::bundle::{Payload, Record};
use serde_json::{json, Value};

/// Bundle key of the static domain entry.
pub const DOMAIN_CONTEXT_KEY: &str = "dcs_context";

/// Known hosts grouped by role.
pub const KNOWN_HOSTS: &[(&str, &[&str])] = &[
    (
        "servers",
        &[
            "DC-Asterisk",
            "DC-HYPERV",
            "DCS Monitor",
            "DCS ODOO",
            "ESXi",
            "VM-TEST",
            "Servidor web dcs.ar",
            "ProxyDCS",
        ],
    ),
    (
        "network",
        &[
            "AP Administracion",
            "AP Comercial",
            "AP Operaciones",
            "Forti DC",
            "Forti Dinamica",
            "HP-Administracion",
        ],
    ),
    ("monitoring", &["Grafana", "NVR", "DCS Monitor"]),
    (
        "physical_access",
        &[
            "Ascensor",
            "Huella ZEM560",
            "Pasillo Limpieza",
            "Pasillo administracion",
            "Pasillo cafeteria",
            "Sala Reunion",
            "Sala operaciones",
            "Sala preventas",
        ],
    ),
    ("external", &["PUBLICA IPLAN", "Chequeo WEB"]),
];

/// Name fragments identifying hosts that belong to the organization.
const DCS_HOST_MARKERS: &[&str] = &[
    "dcs", "dc-", "forti", "hp-", "ap ", "ascensor", "esxi", "vm-", "pasillo", "sala", "proxy",
    "monitor", "odoo", "asterisk", "hyperv", "grafana", "nvr", "huella", "servidor web",
    "publica",
];

/// Category name and the name fragments that select it. First match wins.
const CATEGORY_MARKERS: &[(&str, &[&str])] = &[
    ("infrastructure", &["dc-", "servidor", "hp-", "dell", "vm-"]),
    ("security", &["forti", "proxy", "firewall"]),
    ("network", &["ap ", "mikrotik", "cisco", "switch"]),
    ("monitoring", &["monitor", "grafana", "nvr", "zabbix"]),
    ("virtualization", &["esxi", "vmware", "hyperv"]),
    ("communication", &["asterisk", "telefon"]),
    ("physical_access", &["huella", "ascensor", "pasillo", "sala"]),
    ("business_apps", &["odoo", "web"]),
    ("templates", &["template", "by snmp", "by http", "{"]),
];

/// Build the static domain context entry.
pub fn domain_context() -> Payload {
    let known_hosts: Record = KNOWN_HOSTS
        .iter()
        .map(|(role, hosts)| (role.to_string(), json!(hosts)))
        .collect();

    let mut context = Record::new();
    context.insert("company".into(), json!("DCS Solutions SRL"));
    context.insert("known_hosts".into(), Value::Object(known_hosts));
    context.insert(
        "infrastructure_overview".into(),
        json!({
            "virtualization": "VMware ESXi, Hyper-V",
            "communication": "Asterisk PBX",
            "monitoring": "Zabbix, Grafana",
            "security": "FortiGate firewalls",
            "business_apps": "ODOO ERP",
        }),
    );

    Payload::Summary(context)
}

/// Whether a host display name belongs to the organization.
pub fn is_dcs_host(name: &str) -> bool {
    let lower = name.to_lowercase();
    DCS_HOST_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Group host records into categories by display name.
///
/// Every category is present in the result, possibly empty. Hosts that
/// match no category are left out.
pub fn categorize_hosts(hosts: &[Record]) -> Record {
    let mut groups: Vec<(&str, Vec<Value>)> = CATEGORY_MARKERS
        .iter()
        .map(|(category, _)| (*category, Vec::new()))
        .collect();

    for host in hosts {
        let name = host
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();

        let category = CATEGORY_MARKERS
            .iter()
            .position(|(_, markers)| markers.iter().any(|m| name.contains(m)));

        if let Some(idx) = category {
            groups[idx].1.push(Value::Object(host.clone()));
        }
    }

    groups
        .into_iter()
        .map(|(category, hosts)| (category.to_string(), Value::Array(hosts)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(name: &str) -> Record {
        let mut record = Record::new();
        record.insert("name".into(), json!(name));
        record
    }

    #[test]
    fn test_domain_context_shape() {
        let context = domain_context();
        let summary = context.as_summary().unwrap();

        assert_eq!(summary["company"], json!("DCS Solutions SRL"));
        assert!(summary["known_hosts"]["servers"]
            .as_array()
            .unwrap()
            .contains(&json!("DC-HYPERV")));
    }

    #[test]
    fn test_is_dcs_host() {
        assert!(is_dcs_host("DC-Asterisk"));
        assert!(is_dcs_host("Sala Reunion"));
        assert!(!is_dcs_host("Zabbix server"));
    }

    #[test]
    fn test_categorize_first_match_wins() {
        let hosts = vec![
            host("DC-HYPERV"),
            host("Forti DC"),
            host("ESXi"),
            host("Pasillo Limpieza"),
            host("Unknown box"),
        ];
        let categories = categorize_hosts(&hosts);

        // "DC-HYPERV" matches infrastructure before virtualization
        assert_eq!(categories["infrastructure"].as_array().unwrap().len(), 1);
        assert_eq!(categories["security"].as_array().unwrap().len(), 1);
        assert_eq!(categories["virtualization"].as_array().unwrap().len(), 1);
        assert_eq!(categories["physical_access"].as_array().unwrap().len(), 1);
        assert_eq!(categories.len(), CATEGORY_MARKERS.len());
    }
}
