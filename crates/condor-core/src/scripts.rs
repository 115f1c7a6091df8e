//! Per-role startup scripts embedded in instance metadata.
//!
//! Each script is fixed text. The only substitutions are the administrator
//! email and, for the submit and compute roles, the master's hostname.
//! Shell escapes such as `\$(ALLOW_WRITE)` and the job-accounting regex are
//! emitted verbatim.

/// Node role within the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Master,
    Submit,
    Compute,
}

impl NodeRole {
    /// Render the startup script for this role.
    pub fn startup_script(&self, email: &str, master_host: &str) -> String {
        match self {
            NodeRole::Master => master_script(email),
            NodeRole::Submit => submit_script(email, master_host),
            NodeRole::Compute => compute_script(email, master_host),
        }
    }
}

pub fn master_script(email: &str) -> String {
    format!(
        r#"#!/bin/bash
apt-get update && apt-get install -y wget curl net-tools vim
echo "deb http://research.cs.wisc.edu/htcondor/debian/stable/ jessie contrib" >> /etc/apt/sources.list
wget -qO - http://research.cs.wisc.edu/htcondor/debian/HTCondor-Release.gpg.key | apt-key add -
apt-get update && apt-get install -y condor
if  dpkg -s condor >& /dev/null  ; then echo "yes"; else sleep 10; apt-get install -y condor; fi;
cat <<EOF > /etc/condor/config.d/condor_config.local
DISCARD_SESSION_KEYRING_ON_STARTUP=False
DAEMON_LIST = MASTER
CONDOR_ADMIN={email}
ALLOW_WRITE = \$(ALLOW_WRITE),10.240.0.0/16
EOF
/etc/init.d/condor start
cd /tmp; curl -sSO https://dl.google.com/cloudagents/install-logging-agent.sh
bash install-logging-agent.sh
cat <<EOF > /etc/google-fluentd/config.d/condor.conf
<source>
type tail
format none
path /var/log/condor/*Log
pos_file /var/lib/google-fluentd/pos/condor.pos
read_from_head true
tag condor
</source>
EOF
service google-fluentd restart
"#
    )
}

/// The submit node additionally ships per-job usage parsed out of the
/// job event log.
pub fn submit_script(email: &str, master_host: &str) -> String {
    format!(
        r#"#!/bin/bash
apt-get update && apt-get install -y wget net-tools vim curl gcc
echo "deb http://research.cs.wisc.edu/htcondor/debian/stable/ jessie contrib" >> /etc/apt/sources.list
wget -qO - http://research.cs.wisc.edu/htcondor/debian/HTCondor-Release.gpg.key | apt-key add -
apt-get update && apt-get install -y condor
if  dpkg -s condor >& /dev/null  ; then echo "yes"; else sleep 10; apt-get install -y condor; fi;
cat <<EOF > /etc/condor/config.d/condor_config.local
DISCARD_SESSION_KEYRING_ON_STARTUP=False
CONDOR_ADMIN={email}
CONDOR_HOST={master_host}
DAEMON_LIST = MASTER, SCHEDD
ALLOW_WRITE = \$(ALLOW_WRITE), \$(CONDOR_HOST)
EOF
/etc/init.d/condor start
cd /tmp; curl -sSO https://dl.google.com/cloudagents/install-logging-agent.sh
bash install-logging-agent.sh
cat <<EOF > /etc/google-fluentd/config.d/condor.conf
<source>
type tail
format none
path /var/log/condor/*Log
pos_file /var/lib/google-fluentd/pos/condor.pos
read_from_head true
tag condor
</source>
EOF
cat <<EOF > /etc/google-fluentd/config.d/condor-jobs.conf
<source>
type tail
format multiline
format_firstline /^\.\.\./
format1 /^\.\.\.\n... \((?<job>[^\.]*)\.(?<subjob>[^\.]*)\.(?<run>[^\)]*)\).*Usr 0 (?<usrh>[^:]*):(?<usrm>[^:]*):(?<usrs>[^,]*), Sys 0 (?<sysh>[^:]*):(?<sysm>[^:]*):(?<syss>[^ ]*)  -  Run Remote Usage.*/
types usrh:integer,usrm:integer,usrs:integer,sysh:integer,sysm:integer,syss:integer
path /var/log/condor/jobs/*.log
pos_file /var/lib/google-fluentd/pos/condor-jobs.pos
read_from_head true
tag condor
</source>
EOF
mkdir -p /var/log/condor/jobs
touch /var/log/condor/jobs/stats.log
chmod 666 /var/log/condor/jobs/stats.log
service google-fluentd restart
"#
    )
}

pub fn compute_script(email: &str, master_host: &str) -> String {
    format!(
        r#"#!/bin/bash
apt-get update && apt-get install -y wget net-tools vim curl
echo "deb http://research.cs.wisc.edu/htcondor/debian/stable/ jessie contrib" >> /etc/apt/sources.list
wget -qO - http://research.cs.wisc.edu/htcondor/debian/HTCondor-Release.gpg.key | apt-key add -
apt-get update && apt-get install -y condor
if  dpkg -s condor >& /dev/null  ; then echo "yes"; else sleep 10; apt-get install -y condor; fi;
cat <<EOF > /etc/condor/config.d/condor_config.local
DISCARD_SESSION_KEYRING_ON_STARTUP=False
CONDOR_ADMIN={email}
CONDOR_HOST={master_host}
DAEMON_LIST = MASTER, STARTD
ALLOW_WRITE = \$(ALLOW_WRITE), \$(CONDOR_HOST)
EOF
cd /tmp; curl -sSO https://dl.google.com/cloudagents/install-logging-agent.sh
bash install-logging-agent.sh
/etc/init.d/condor start
cat <<EOF > /etc/google-fluentd/config.d/condor.conf
<source>
type tail
format none
path /var/log/condor/*Log
pos_file /var/lib/google-fluentd/pos/condor.pos
read_from_head true
tag condor
</source>
EOF
service google-fluentd restart
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_master_script_substitutes_email() {
        let script = master_script("admin@example.com");
        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.lines().any(|l| l == "CONDOR_ADMIN=admin@example.com"));
        assert!(script.lines().any(|l| l == "DAEMON_LIST = MASTER"));
        assert!(!script.contains("CONDOR_HOST="));
    }

    #[test]
    fn test_shell_escapes_pass_through() {
        let script = master_script("a@b.c");
        assert!(script.contains(r"ALLOW_WRITE = \$(ALLOW_WRITE),10.240.0.0/16"));

        let script = compute_script("a@b.c", "condor-master");
        assert!(script.contains(r"ALLOW_WRITE = \$(ALLOW_WRITE), \$(CONDOR_HOST)"));
    }

    #[test]
    fn test_submit_script_job_accounting() {
        let script = submit_script("a@b.c", "condor-master");
        assert!(script.lines().any(|l| l == "CONDOR_HOST=condor-master"));
        assert!(script.lines().any(|l| l == "DAEMON_LIST = MASTER, SCHEDD"));
        assert!(script.contains("format_firstline /^\\.\\.\\./"));
        assert!(script.contains(r"\((?<job>[^\.]*)\.(?<subjob>[^\.]*)\.(?<run>[^\)]*)\)"));
        assert!(script.contains("(?<syss>[^ ]*)  -  Run Remote Usage.*/"));
        assert!(script.contains("/var/log/condor/jobs/stats.log"));
    }

    #[test]
    fn test_compute_script_role() {
        let script = NodeRole::Compute.startup_script("a@b.c", "head");
        assert!(script.lines().any(|l| l == "DAEMON_LIST = MASTER, STARTD"));
        assert!(script.lines().any(|l| l == "CONDOR_HOST=head"));
        assert!(!script.contains("condor-jobs.conf"));
        // Logging agent is installed before condor starts on compute nodes.
        let agent = script.find("install-logging-agent.sh").unwrap();
        let start = script.find("/etc/init.d/condor start").unwrap();
        assert!(agent < start);
    }

    #[test]
    fn test_scripts_depend_only_on_substitutions() {
        let a = submit_script("x@y.z", "condor-master");
        let b = submit_script("other@y.z", "condor-master");
        assert_eq!(
            a.replace("x@y.z", "<email>"),
            b.replace("other@y.z", "<email>")
        );
    }
}
