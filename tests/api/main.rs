mod dbs_requests;
